//! Typed HTTP client for the order service API.
//!
//! One method per endpoint. Every `/api` response is unwrapped from the
//! `{success, data|error}` envelope; failures come back as
//! [`ClientError::Api`] carrying the server's status and message. Nothing is
//! retried.

use std::time::Duration;

use brew_schemas::{
    AdminLogin, ApiResponse, MenuItem, NewOrder, Order, OrderStatus, OrderStatusChange,
    OrderStatusUpdate, PasswordChange, PasswordChanged, PlacedOrder, StockLevel,
    StockResetSummary, StockUpdate,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{Cart, ClientError, StockCache};

/// Which orders to list. Mirrors the `tab` / `status` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderQuery {
    #[default]
    All,
    Status(OrderStatus),
    /// Pending and in-progress orders.
    InProgressTab,
    CompletedTab,
}

impl OrderQuery {
    fn params(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            OrderQuery::All => Vec::new(),
            OrderQuery::Status(s) => vec![("status", s.as_str())],
            OrderQuery::InProgressTab => vec![("tab", "in-progress")],
            OrderQuery::CompletedTab => vec![("tab", "completed")],
        }
    }
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the order service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Health ───────────────────────────────────────────────────────────

    /// `true` when `/health` answers `{"status":"ok"}`.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.request(Method::GET, "/health").send().await?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let body: HealthBody = resp.json().await?;
        Ok(body.status == "ok")
    }

    // ── Menus ────────────────────────────────────────────────────────────

    pub async fn list_menus(&self) -> Result<Vec<MenuItem>, ClientError> {
        self.data(self.request(Method::GET, "/api/menus")).await
    }

    pub async fn get_menu(&self, menu_id: i32) -> Result<MenuItem, ClientError> {
        let path = format!("/api/menus/{menu_id}");
        self.data(self.request(Method::GET, &path)).await
    }

    pub async fn update_stock(
        &self,
        menu_id: i32,
        update: &StockUpdate,
    ) -> Result<StockLevel, ClientError> {
        let path = format!("/api/menus/{menu_id}/stock");
        self.data(self.json(Method::PATCH, &path, update)).await
    }

    pub async fn reset_stock(&self) -> Result<StockResetSummary, ClientError> {
        self.data(self.request(Method::POST, "/api/menus/reset-stock"))
            .await
    }

    // ── Orders ───────────────────────────────────────────────────────────

    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>, ClientError> {
        let req = self
            .request(Method::GET, "/api/orders")
            .query(&query.params());
        self.data(req).await
    }

    pub async fn get_order(&self, order_id: i32) -> Result<Order, ClientError> {
        let path = format!("/api/orders/{order_id}");
        self.data(self.request(Method::GET, &path)).await
    }

    pub async fn create_order(&self, order: &NewOrder) -> Result<PlacedOrder, ClientError> {
        self.data(self.json(Method::POST, "/api/orders", order))
            .await
    }

    pub async fn update_order_status(
        &self,
        order_id: i32,
        status: OrderStatus,
    ) -> Result<OrderStatusChange, ClientError> {
        let path = format!("/api/orders/{order_id}");
        self.data(self.json(Method::PATCH, &path, &OrderStatusUpdate { status }))
            .await
    }

    /// Submit the cart with an optimistic stock reservation.
    ///
    /// The reservation is confirmed when the server accepts the order and
    /// released when it does not; the request itself is sent exactly once.
    pub async fn place_cart(
        &self,
        cart: &Cart,
        cache: &mut StockCache,
    ) -> Result<PlacedOrder, ClientError> {
        let order = cart.to_new_order()?;
        let reservation = cache.reserve(&order)?;

        match self.create_order(&order).await {
            Ok(placed) => {
                cache.confirm(reservation);
                Ok(placed)
            }
            Err(e) => {
                cache.release(reservation);
                tracing::warn!(error = %e, "order rejected; reservation released");
                Err(e)
            }
        }
    }

    /// Re-read the menu list and reconcile `cache` against it.
    pub async fn refresh_stock(&self, cache: &mut StockCache) -> Result<(), ClientError> {
        let menus = self.list_menus().await?;
        cache.reconcile(&menus);
        Ok(())
    }

    // ── Admin ────────────────────────────────────────────────────────────

    pub async fn admin_login(&self, password: &str) -> Result<(), ClientError> {
        let body = AdminLogin {
            password: password.to_string(),
        };
        self.send::<()>(self.json(Method::POST, "/api/auth/admin", &body))
            .await?;
        Ok(())
    }

    pub async fn change_admin_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<PasswordChanged, ClientError> {
        let body = PasswordChange {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.data(self.json(Method::PATCH, "/api/settings/admin-password", &body))
            .await
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "request");
        self.client.request(method, url)
    }

    fn json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> RequestBuilder {
        self.request(method, path).json(body)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<ApiResponse<T>, ClientError> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        decode_envelope(status, &body)
    }

    async fn data<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        self.send::<T>(req)
            .await?
            .data
            .ok_or_else(|| ClientError::MalformedResponse("envelope has no data".to_string()))
    }
}

/// Decode a response body into the envelope, turning error envelopes and
/// non-2xx statuses into [`ClientError::Api`].
pub fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
) -> Result<ApiResponse<T>, ClientError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text
                }
            });
        return Err(ClientError::Api { status, message });
    }

    let envelope: ApiResponse<T> = serde_json::from_slice(body)
        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
    if !envelope.success {
        return Err(ClientError::Api {
            status,
            message: envelope
                .error
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_envelopes_unwrap() {
        let body = br#"{"success":true,"data":{"id":3,"stock":7}}"#;
        let env: ApiResponse<StockLevel> = decode_envelope(200, body).unwrap();
        assert_eq!(env.data, Some(StockLevel { id: 3, stock: 7 }));
    }

    #[test]
    fn message_only_envelopes_have_no_data() {
        let body = br#"{"success":true,"message":"authenticated"}"#;
        let env: ApiResponse<()> = decode_envelope(200, body).unwrap();
        assert!(env.data.is_none());
        assert_eq!(env.message.as_deref(), Some("authenticated"));
    }

    #[test]
    fn error_envelopes_carry_status_and_message() {
        let body = br#"{"success":false,"error":"insufficient stock: Latte (stock: 0, requested: 1)"}"#;
        let err = decode_envelope::<PlacedOrder>(400, body).unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("insufficient stock"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn non_json_errors_fall_back_to_body_or_status() {
        let err = decode_envelope::<()>(502, b"Bad Gateway").unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("Bad Gateway"));

        let err = decode_envelope::<()>(405, b"").unwrap_err();
        assert!(err.to_string().contains("HTTP 405"));
    }

    #[test]
    fn status_helpers() {
        let nf = decode_envelope::<()>(404, br#"{"success":false,"error":"order not found"}"#)
            .unwrap_err();
        assert!(nf.is_not_found());
        assert!(!nf.is_unauthorized());
    }

    #[test]
    fn order_queries_map_to_query_params() {
        assert!(OrderQuery::All.params().is_empty());
        assert_eq!(
            OrderQuery::InProgressTab.params(),
            vec![("tab", "in-progress")]
        );
        assert_eq!(
            OrderQuery::Status(OrderStatus::Completed).params(),
            vec![("status", "completed")]
        );
    }
}
