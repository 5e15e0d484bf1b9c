//! Shape and range checks for incoming requests.
//!
//! The HTTP layer hands over the raw JSON body so that "items is not an
//! array" and "total_amount is a string" surface as validation failures with
//! a precise message instead of a generic decode error.

use brew_schemas::{NewOrder, NewOrderItem, OrderStatus};
use serde_json::Value;

use crate::ValidationError;

/// Parse and validate a `POST /api/orders` body.
pub fn parse_new_order(body: &Value) -> Result<NewOrder, ValidationError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ValidationError::new("request body must be a JSON object"))?;

    let raw_items = match obj.get("items") {
        Some(Value::Array(a)) if !a.is_empty() => a,
        _ => return Err(ValidationError::new("items must be a non-empty array")),
    };

    let total_amount = obj
        .get("total_amount")
        .and_then(as_whole_i64)
        .filter(|v| *v >= 0)
        .ok_or_else(|| ValidationError::new("total_amount must be a non-negative integer"))?;

    let mut items = Vec::with_capacity(raw_items.len());
    for (idx, raw) in raw_items.iter().enumerate() {
        items.push(parse_item(idx, raw)?);
    }

    validate_new_order(NewOrder {
        items,
        total_amount,
    })
}

fn parse_item(idx: usize, raw: &Value) -> Result<NewOrderItem, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::new(format!("items[{idx}] must be an object")))?;

    let menu_id = obj
        .get("menu_id")
        .and_then(as_i32)
        .ok_or_else(|| ValidationError::new(format!("items[{idx}].menu_id must be an integer")))?;

    let quantity = obj.get("quantity").and_then(as_i32).ok_or_else(|| {
        ValidationError::new(format!("items[{idx}].quantity must be a positive integer"))
    })?;

    let item_price = obj.get("item_price").and_then(Value::as_i64).ok_or_else(|| {
        ValidationError::new(format!(
            "items[{idx}].item_price must be a non-negative integer"
        ))
    })?;

    let option_ids = match obj.get("option_ids") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(ids)) => ids
            .iter()
            .map(as_i32)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                ValidationError::new(format!(
                    "items[{idx}].option_ids must be an array of integers"
                ))
            })?,
        Some(_) => {
            return Err(ValidationError::new(format!(
                "items[{idx}].option_ids must be an array of integers"
            )))
        }
    };

    Ok(NewOrderItem {
        menu_id,
        quantity,
        option_ids,
        item_price,
    })
}

/// Range checks on an already-typed order. Collapses duplicate option ids on
/// each line, keeping first occurrence order.
pub fn validate_new_order(mut order: NewOrder) -> Result<NewOrder, ValidationError> {
    if order.items.is_empty() {
        return Err(ValidationError::new("items must be a non-empty array"));
    }
    if order.total_amount < 0 {
        return Err(ValidationError::new(
            "total_amount must be a non-negative integer",
        ));
    }

    for (idx, item) in order.items.iter_mut().enumerate() {
        if item.quantity < 1 {
            return Err(ValidationError::new(format!(
                "items[{idx}].quantity must be a positive integer"
            )));
        }
        if item.item_price < 0 {
            return Err(ValidationError::new(format!(
                "items[{idx}].item_price must be a non-negative integer"
            )));
        }
        let mut seen = std::collections::HashSet::new();
        item.option_ids.retain(|id| seen.insert(*id));
    }

    Ok(order)
}

/// Parse the `{status}` body of `PATCH /api/orders/:id`.
pub fn parse_status_target(body: &Value) -> Result<OrderStatus, ValidationError> {
    body.get("status")
        .and_then(Value::as_str)
        .and_then(OrderStatus::parse)
        .ok_or_else(|| {
            ValidationError::new("status must be one of: pending, in_progress, completed")
        })
}

/// A JSON integer, or a float with no fractional part (`1000.0`).
fn as_whole_i64(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        let f = v.as_f64()?;
        // Beyond 2^53 a float no longer names a single integer.
        (f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0).then_some(f as i64)
    })
}

fn as_i32(v: &Value) -> Option<i32> {
    v.as_i64().and_then(|n| i32::try_from(n).ok())
}
