//! Client-side stock view with optimistic reservations.
//!
//! The cache holds the last server-confirmed stock per menu plus the
//! reservations of orders that are in flight. It is an ordinary value owned
//! by its caller; there is no global state.

use std::collections::BTreeMap;

use brew_schemas::{MenuItem, NewOrder, StockLevel};

use crate::ClientError;

/// Handle for one in-flight reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservationId(u64);

#[derive(Debug, Default, Clone)]
pub struct StockCache {
    confirmed: BTreeMap<i32, i32>,
    /// Reserved quantity per menu, per reservation.
    pending: BTreeMap<ReservationId, BTreeMap<i32, i64>>,
    next_id: u64,
}

impl StockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a fresh `GET /api/menus` snapshot.
    pub fn from_menus(menus: &[MenuItem]) -> Self {
        let mut cache = Self::new();
        cache.reconcile(menus);
        cache
    }

    /// Last stock the server reported for `menu_id`.
    pub fn confirmed(&self, menu_id: i32) -> Option<i32> {
        self.confirmed.get(&menu_id).copied()
    }

    fn reserved(&self, menu_id: i32) -> i64 {
        self.pending
            .values()
            .filter_map(|lines| lines.get(&menu_id))
            .sum()
    }

    /// Confirmed stock minus pending reservations, floored at 0. Unknown menus
    /// have nothing available.
    pub fn available(&self, menu_id: i32) -> i32 {
        let confirmed = i64::from(self.confirmed(menu_id).unwrap_or(0));
        let left = (confirmed - self.reserved(menu_id)).max(0);
        i32::try_from(left).unwrap_or(i32::MAX)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Reserve the quantities of `order`. Refused as a whole if any menu lacks
    /// stock; nothing is recorded in that case.
    pub fn reserve(&mut self, order: &NewOrder) -> Result<ReservationId, ClientError> {
        let mut wanted: BTreeMap<i32, i64> = BTreeMap::new();
        for item in &order.items {
            *wanted.entry(item.menu_id).or_default() += i64::from(item.quantity);
        }

        for (&menu_id, &requested) in &wanted {
            let available = self.available(menu_id);
            if requested > i64::from(available) {
                return Err(ClientError::InsufficientStock {
                    menu_id,
                    available,
                    requested,
                });
            }
        }

        let id = ReservationId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, wanted);
        Ok(id)
    }

    /// The server accepted the order: fold the reservation into confirmed
    /// stock. Unknown ids are ignored.
    pub fn confirm(&mut self, id: ReservationId) {
        let Some(lines) = self.pending.remove(&id) else {
            return;
        };
        for (menu_id, qty) in lines {
            if let Some(stock) = self.confirmed.get_mut(&menu_id) {
                let next = (i64::from(*stock) - qty).max(0);
                *stock = i32::try_from(next).unwrap_or(0);
            }
        }
    }

    /// The server rejected the order: drop the reservation.
    pub fn release(&mut self, id: ReservationId) {
        self.pending.remove(&id);
    }

    /// Replace confirmed stock with the server snapshot. Pending reservations
    /// stay until confirmed or released.
    pub fn reconcile(&mut self, menus: &[MenuItem]) {
        self.confirmed = menus.iter().map(|m| (m.id, m.stock)).collect();
    }

    /// Apply a single server-reported level (e.g. a stock PATCH response).
    pub fn apply_level(&mut self, level: StockLevel) {
        self.confirmed.insert(level.id, level.stock);
    }
}
