//! Shared runtime state for brew-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. All mutable state lives
//! in Postgres; this module holds only the pool, settings and the event bus.

use std::time::Duration;

use brew_config::AppConfig;
use brew_db::PasswordRules;
use brew_orders::TotalPolicy;
use brew_schemas::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    OrderCreated {
        order_id: i32,
        total_amount: i64,
    },
    OrderStatus {
        order_id: i32,
        status: OrderStatus,
        completed_time: Option<DateTime<Utc>>,
    },
    StockChanged {
        menu_id: i32,
        stock: i32,
    },
    StockReset {
        updated_count: u64,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::OrderCreated { .. } => "order_created",
            BusMsg::OrderStatus { .. } => "order_status",
            BusMsg::StockChanged { .. } => "stock_changed",
            BusMsg::StockReset { .. } => "stock_reset",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in the banner response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub total_policy: TotalPolicy,
    pub password_rules: PasswordRules,
}

impl AppState {
    pub fn new(pool: PgPool, cfg: &AppConfig) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            pool,
            bus,
            build: BuildInfo {
                service: "brew-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            total_policy: cfg.orders.total_policy,
            password_rules: PasswordRules {
                length: cfg.admin.password_length,
            },
        }
    }

    /// Publish to SSE subscribers. Having no subscribers is not an error.
    pub fn publish(&self, msg: BusMsg) {
        let _ = self.bus.send(msg);
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
