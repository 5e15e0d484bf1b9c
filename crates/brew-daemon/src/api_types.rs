//! Request and response types for the brew-daemon HTTP endpoints.
//!
//! Bodies shared with clients live in `brew-schemas` and are re-exported here;
//! the rest are daemon-only. No business logic lives here.

use serde::{Deserialize, Serialize};

pub use brew_schemas::{AdminLogin, ApiResponse, OrderStatusUpdate, PasswordChange, StockUpdate};

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerResponse {
    pub message: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Plain (un-enveloped) liveness body: `{"status":"ok"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ---------------------------------------------------------------------------
// GET /api/orders
// ---------------------------------------------------------------------------

/// Query string of the order listing. `tab` wins over `status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    pub tab: Option<String>,
    pub status: Option<String>,
}
