//! Wire/data types shared by the daemon, the CLI and the client.
//!
//! Field names match the JSON bodies of the REST API. No business logic lives
//! here; state-machine rules are in `brew-orders`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub id: i32,
    pub name: String,
    pub additional_price: i64,
}

/// A sellable menu item with its options and current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i32,
    pub name: String,
    /// Unit price in the smallest currency unit.
    pub price: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub stock: i32,
    pub options: Vec<MenuOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: i32,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockResetSummary {
    #[serde(rename = "updatedCount")]
    pub updated_count: u64,
    pub menus: Vec<StockLevel>,
}

// ---------------------------------------------------------------------------
// Order status
// ---------------------------------------------------------------------------

/// Lifecycle status of an order. Stored as lowercase text in the DB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "in_progress" => Some(OrderStatus::InProgress),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Order requests
// ---------------------------------------------------------------------------

/// One requested line of a new order. `option_ids` is a set; duplicates are
/// collapsed during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub menu_id: i32,
    pub quantity: i32,
    #[serde(default)]
    pub option_ids: Vec<i32>,
    pub item_price: i64,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
    pub total_amount: i64,
}

// ---------------------------------------------------------------------------
// Order read models
// ---------------------------------------------------------------------------

/// Result of a successful order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: i32,
    pub order_time: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i32,
    pub menu_id: i32,
    pub menu_name: String,
    pub quantity: i32,
    pub item_price: i64,
    pub options: Vec<MenuOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i32,
    pub order_time: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub items: Vec<OrderLine>,
}

/// Result of a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub id: i32,
    pub status: OrderStatus,
    pub completed_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub changed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `PATCH /api/orders/:id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Body of `PATCH /api/menus/:id/stock`. Exactly one field must be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogin {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// `{success, data | error, message?}` wrapper used by every `/api` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload (e.g. admin login).
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_matches_wire_format() {
        for s in OrderStatus::ALL {
            let json = serde_json::to_value(s).unwrap();
            assert_eq!(json, serde_json::Value::String(s.as_str().to_string()));
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("IN_PROGRESS"), None);
        assert_eq!(OrderStatus::parse("in-progress"), None);
    }

    #[test]
    fn reset_summary_uses_camel_case_count() {
        let summary = StockResetSummary {
            updated_count: 2,
            menus: vec![StockLevel { id: 1, stock: 0 }, StockLevel { id: 2, stock: 0 }],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["updatedCount"], 2);
        assert_eq!(json["menus"][1]["id"], 2);
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(StockLevel { id: 1, stock: 3 })).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": {"id": 1, "stock": 3}}));

        let err = serde_json::to_value(ApiResponse::<()>::err("menu not found: id 9")).unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "menu not found: id 9"}));

        let back: ApiResponse<StockLevel> =
            serde_json::from_str(r#"{"success":false,"error":"x"}"#).unwrap();
        assert!(back.data.is_none());
    }

    #[test]
    fn stock_update_serializes_only_the_chosen_form() {
        let body = StockUpdate {
            change: Some(-1),
            stock: None,
        };
        assert_eq!(serde_json::to_value(body).unwrap(), serde_json::json!({"change": -1}));
    }

    #[test]
    fn new_order_item_defaults_missing_options_to_empty() {
        let item: NewOrderItem =
            serde_json::from_str(r#"{"menu_id":1,"quantity":2,"item_price":4000}"#).unwrap();
        assert!(item.option_ids.is_empty());
    }
}
