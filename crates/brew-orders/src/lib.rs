//! brew-orders
//!
//! Pure, DB-free order logic:
//! - order status state machine (`pending -> in_progress -> completed`)
//! - request validation for new orders and stock adjustments
//! - pricing and total verification
//! - per-order stock planning against a locked stock snapshot
//!
//! `brew-db` runs these inside its transactions; nothing here performs I/O.

mod error;
mod pricing;
mod status;
mod stock;
mod validate;

pub use error::{StockPlanError, StockShortfall, TransitionError, ValidationError};

pub use pricing::{line_total, order_total, unit_price, verify_total, TotalPolicy};

pub use status::{check_transition, is_terminal, next_status, StatusChange};

pub use stock::{plan_stock, MenuStock, StockAdjustment, StockPlan, StockSnapshot};

pub use validate::{parse_new_order, parse_status_target, validate_new_order};
