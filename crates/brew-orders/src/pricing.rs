//! Integer pricing in the smallest currency unit.
//!
//! All arithmetic is checked; an overflow is reported as `None` and turned
//! into a validation failure by callers. There is no floating point anywhere
//! on the pricing path.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// How `total_amount` on a new order is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalPolicy {
    /// Recompute the total from current menu and option prices and reject a
    /// mismatch.
    #[default]
    Verify,
    /// Accept the caller's total after type/sign checks only.
    Trust,
}

impl TotalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalPolicy::Verify => "verify",
            TotalPolicy::Trust => "trust",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" => Some(TotalPolicy::Verify),
            "trust" => Some(TotalPolicy::Trust),
            _ => None,
        }
    }
}

/// Unit price of one line: base price plus every selected option.
pub fn unit_price<I>(base_price: i64, option_prices: I) -> Option<i64>
where
    I: IntoIterator<Item = i64>,
{
    option_prices
        .into_iter()
        .try_fold(base_price, |acc, p| acc.checked_add(p))
}

pub fn line_total(unit_price: i64, quantity: i32) -> Option<i64> {
    unit_price.checked_mul(i64::from(quantity))
}

/// Sum of `(unit_price, quantity)` lines. Order of lines does not matter.
pub fn order_total<I>(lines: I) -> Option<i64>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines
        .into_iter()
        .try_fold(0i64, |acc, (unit, qty)| acc.checked_add(line_total(unit, qty)?))
}

/// Apply `policy` to a caller-claimed total and the server-computed one.
pub fn verify_total(
    policy: TotalPolicy,
    claimed: i64,
    computed: i64,
) -> Result<(), ValidationError> {
    match policy {
        TotalPolicy::Trust => Ok(()),
        TotalPolicy::Verify if claimed == computed => Ok(()),
        TotalPolicy::Verify => Err(ValidationError::new(format!(
            "total_amount mismatch: request says {claimed}, menu prices give {computed}"
        ))),
    }
}
