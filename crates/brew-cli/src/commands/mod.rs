//! Command handler modules for the `brew` CLI.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod admin;
pub mod menu;
pub mod order;

use anyhow::Result;
use brew_schemas::OrderStatus;
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI `--to` / `--status` string into an [`OrderStatus`].
pub fn parse_order_status(raw: &str) -> Result<OrderStatus> {
    let s = raw.trim().to_lowercase().replace('-', "_");
    OrderStatus::parse(&s).ok_or_else(|| {
        anyhow::anyhow!(
            "invalid status '{}'. expected one of: pending | in_progress | completed",
            raw
        )
    })
}

pub fn opt_dt(dt: &Option<DateTime<Utc>>) -> String {
    dt.as_ref().map(|d| d.to_rfc3339()).unwrap_or_default()
}
