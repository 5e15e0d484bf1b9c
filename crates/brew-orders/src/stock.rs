//! Stock planning and direct stock adjustment.
//!
//! [`plan_stock`] walks the lines of one order in the order given, against a
//! snapshot of the touched menus that the caller has already row-locked. Each
//! line sees the decrements of the lines before it, so two lines naming the
//! same menu cannot both claim the last unit.

use std::collections::BTreeMap;

use brew_schemas::NewOrderItem;
use serde_json::Value;

use crate::{StockPlanError, StockShortfall, ValidationError};

/// Locked view of one menu row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuStock {
    pub name: String,
    pub price: i64,
    pub stock: i32,
}

/// Menu id -> locked row. Ids absent from the map do not exist.
pub type StockSnapshot = BTreeMap<i32, MenuStock>;

/// Outcome of a successful plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPlan {
    /// Final stock per touched menu id, ascending by id.
    pub remaining: BTreeMap<i32, i32>,
}

impl StockPlan {
    /// `(menu_id, new_stock)` pairs in ascending id order.
    pub fn updates(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.remaining.iter().map(|(id, stock)| (*id, *stock))
    }
}

/// Check-and-decrement every line against `snapshot`.
///
/// Fails on the first line (in request order) whose menu is missing or whose
/// quantity exceeds the stock still available to it. Nothing is mutated on
/// failure; the caller simply discards the plan.
pub fn plan_stock(
    items: &[NewOrderItem],
    snapshot: &StockSnapshot,
) -> Result<StockPlan, StockPlanError> {
    let mut remaining: BTreeMap<i32, i32> = BTreeMap::new();

    for item in items {
        let menu = snapshot
            .get(&item.menu_id)
            .ok_or(StockPlanError::MissingMenu {
                menu_id: item.menu_id,
            })?;

        let available = remaining.entry(item.menu_id).or_insert(menu.stock);
        if *available < item.quantity {
            return Err(StockPlanError::Insufficient(StockShortfall {
                menu_id: item.menu_id,
                name: menu.name.clone(),
                stock: *available,
                requested: item.quantity,
            }));
        }
        *available -= item.quantity;
    }

    Ok(StockPlan { remaining })
}

// ---------------------------------------------------------------------------
// Direct adjustment
// ---------------------------------------------------------------------------

/// Body of `PATCH /api/menus/:id/stock`: exactly one of `{change}` or
/// `{stock}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// Relative: new stock = current + change.
    Change(i64),
    /// Absolute: new stock = value.
    Absolute(i32),
}

impl StockAdjustment {
    /// Parse a JSON body. Negative absolute values are rejected here, before
    /// any lookup.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let obj = body
            .as_object()
            .ok_or_else(|| ValidationError::new("request body must be a JSON object"))?;

        match (obj.get("change"), obj.get("stock")) {
            (Some(_), Some(_)) => Err(ValidationError::new(
                "provide either change or stock, not both",
            )),
            (None, None) => Err(ValidationError::new(
                "stock change (change) or stock value (stock) is required",
            )),
            (Some(change), None) => change
                .as_i64()
                .map(StockAdjustment::Change)
                .ok_or_else(|| ValidationError::new("change must be an integer")),
            (None, Some(stock)) => Self::absolute(
                stock
                    .as_i64()
                    .ok_or_else(|| ValidationError::new("stock must be a non-negative integer"))?,
            ),
        }
    }

    /// Build an absolute adjustment, rejecting negative or out-of-range values.
    pub fn absolute(value: i64) -> Result<Self, ValidationError> {
        if value < 0 {
            return Err(ValidationError::new("stock must be a non-negative integer"));
        }
        i32::try_from(value)
            .map(StockAdjustment::Absolute)
            .map_err(|_| ValidationError::new("stock is out of range"))
    }

    /// New stock given the freshly read `current`. No clamping.
    pub fn apply(&self, current: i32) -> Result<i32, ValidationError> {
        match *self {
            StockAdjustment::Absolute(v) => Ok(v),
            StockAdjustment::Change(delta) => {
                let next = i64::from(current)
                    .checked_add(delta)
                    .ok_or_else(|| ValidationError::new("stock change is out of range"))?;
                if next < 0 {
                    return Err(ValidationError::new(format!(
                        "stock cannot go below 0 (current {current}, change {delta})"
                    )));
                }
                i32::try_from(next).map_err(|_| ValidationError::new("stock is out of range"))
            }
        }
    }
}
