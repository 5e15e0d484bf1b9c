//! Shopping cart.
//!
//! Lines are keyed by menu and the sorted set of chosen options, so adding
//! the same drink with the same options bumps the quantity instead of adding
//! a second line. Quantities per menu are bounded by what the
//! [`StockCache`] says is available.

use brew_orders::{line_total, order_total, unit_price};
use brew_schemas::{MenuItem, MenuOption, NewOrder, NewOrderItem};

use crate::{ClientError, StockCache};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub menu_id: i32,
    /// Sorted, no duplicates.
    pub option_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub menu_id: i32,
    pub menu_name: String,
    pub base_price: i64,
    /// Sorted by id.
    pub options: Vec<MenuOption>,
    pub quantity: i32,
}

impl CartLine {
    pub fn key(&self) -> CartKey {
        CartKey {
            menu_id: self.menu_id,
            option_ids: self.options.iter().map(|o| o.id).collect(),
        }
    }

    /// Base price plus every option, per unit.
    pub fn unit_price(&self) -> Result<i64, ClientError> {
        unit_price(self.base_price, self.options.iter().map(|o| o.additional_price))
            .ok_or_else(|| overflow(self.menu_id))
    }

    pub fn line_total(&self) -> Result<i64, ClientError> {
        line_total(self.unit_price()?, self.quantity).ok_or_else(|| overflow(self.menu_id))
    }
}

fn overflow(menu_id: i32) -> ClientError {
    ClientError::Validation(format!("price of menu {menu_id} is out of range"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Units of `menu_id` across all lines, whatever their options.
    pub fn quantity_for(&self, menu_id: i32) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.menu_id == menu_id)
            .map(|l| i64::from(l.quantity))
            .sum()
    }

    /// Add `quantity` of `menu` with the given options.
    pub fn add(
        &mut self,
        menu: &MenuItem,
        option_ids: &[i32],
        quantity: i32,
        cache: &StockCache,
    ) -> Result<CartKey, ClientError> {
        if quantity <= 0 {
            return Err(ClientError::Validation(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let mut ids = option_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let options = ids
            .iter()
            .map(|id| {
                menu.options
                    .iter()
                    .find(|o| o.id == *id)
                    .cloned()
                    .ok_or_else(|| {
                        ClientError::Validation(format!(
                            "option {id} does not belong to menu {}",
                            menu.id
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let requested = self.quantity_for(menu.id) + i64::from(quantity);
        check_available(cache, menu.id, requested)?;

        let key = CartKey {
            menu_id: menu.id,
            option_ids: ids,
        };
        match self.lines.iter_mut().find(|l| l.key() == key) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(CartLine {
                menu_id: menu.id,
                menu_name: menu.name.clone(),
                base_price: menu.price,
                options,
                quantity,
            }),
        }
        Ok(key)
    }

    /// Set a line's quantity; 0 removes it.
    pub fn set_quantity(
        &mut self,
        key: &CartKey,
        quantity: i32,
        cache: &StockCache,
    ) -> Result<(), ClientError> {
        if quantity < 0 {
            return Err(ClientError::Validation(
                "quantity must not be negative".to_string(),
            ));
        }
        if quantity == 0 {
            self.remove(key);
            return Ok(());
        }

        let current = self
            .lines
            .iter()
            .find(|l| &l.key() == key)
            .map(|l| i64::from(l.quantity))
            .ok_or_else(|| ClientError::Validation("no such cart line".to_string()))?;
        let requested = self.quantity_for(key.menu_id) - current + i64::from(quantity);
        check_available(cache, key.menu_id, requested)?;

        if let Some(line) = self.lines.iter_mut().find(|l| &l.key() == key) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove(&mut self, key: &CartKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.key() != key);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line totals.
    pub fn total(&self) -> Result<i64, ClientError> {
        let lines = self
            .lines
            .iter()
            .map(|l| Ok((l.unit_price()?, l.quantity)))
            .collect::<Result<Vec<_>, ClientError>>()?;
        order_total(lines)
            .ok_or_else(|| ClientError::Validation("order total is out of range".to_string()))
    }

    /// Build the `POST /api/orders` body.
    pub fn to_new_order(&self) -> Result<NewOrder, ClientError> {
        if self.is_empty() {
            return Err(ClientError::Validation("cart is empty".to_string()));
        }

        let items = self
            .lines
            .iter()
            .map(|l| {
                Ok(NewOrderItem {
                    menu_id: l.menu_id,
                    quantity: l.quantity,
                    option_ids: l.options.iter().map(|o| o.id).collect(),
                    item_price: l.unit_price()?,
                })
            })
            .collect::<Result<Vec<_>, ClientError>>()?;

        Ok(NewOrder {
            items,
            total_amount: self.total()?,
        })
    }
}

fn check_available(cache: &StockCache, menu_id: i32, requested: i64) -> Result<(), ClientError> {
    let available = cache.available(menu_id);
    if requested > i64::from(available) {
        return Err(ClientError::InsufficientStock {
            menu_id,
            available,
            requested,
        });
    }
    Ok(())
}
