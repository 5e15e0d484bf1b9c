//! Axum router and all HTTP handlers for brew-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Every `/api` response uses the `{success, data|error}`
//! envelope; [`ApiError`] maps service failures to status codes.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, patch, post},
    Json, Router,
};
use brew_db::{OrderListFilter, ServiceError};
use brew_orders::{parse_new_order, parse_status_target, StockAdjustment, ValidationError};
use brew_schemas::{
    MenuItem, Order, OrderStatusChange, PasswordChanged, PlacedOrder, StockLevel,
    StockResetSummary,
};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

use crate::{
    api_types::{ApiResponse, BannerResponse, HealthResponse, OrderListQuery},
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/api/menus", get(list_menus))
        .route("/api/menus/reset-stock", post(reset_stock))
        .route("/api/menus/:id", get(get_menu))
        .route("/api/menus/:id/stock", patch(update_stock))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/:id", get(get_order).patch(update_order_status))
        .route("/api/auth/admin", post(admin_login))
        .route("/api/settings/admin-password", patch(change_admin_password))
        .route("/api/stream", get(stream))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Handler failure rendered as an error envelope.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(e.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_)
            | ServiceError::InsufficientStock { .. }
            | ServiceError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self.0 {
            // Infrastructure detail stays in the log.
            ServiceError::Unexpected(e) => {
                error!(error = %format!("{e:#}"), "request failed");
                "internal server error".to_string()
            }
            other => {
                warn!(kind = other.kind(), error = %other, "request rejected");
                other.to_string()
            }
        };
        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Path ids must be integers; anything else is a 400, not a 404.
fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ValidationError::new(format!("invalid id: {raw}")).into())
}

/// Malformed or non-JSON bodies are a 400 with the extractor's reason.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|rej| ValidationError::new(format!("invalid JSON body: {}", rej.body_text())).into())
}

/// Unparseable query strings (e.g. a repeated key) are a 400 as well.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|rej| ValidationError::new(format!("invalid query: {}", rej.body_text())).into())
}

/// A string field of a JSON object; absent or non-string reads as empty.
fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// GET /  and  GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn banner(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(BannerResponse {
        message: "Coffee Order App API Server".to_string(),
        version: st.build.version.to_string(),
    })
}

pub(crate) async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}

pub(crate) async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err(format!("not found: {}", uri.path()))),
    )
}

pub(crate) async fn method_not_allowed(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::<()>::err(format!(
            "method {method} not allowed on {}",
            uri.path()
        ))),
    )
}

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

pub(crate) async fn list_menus(State(st): State<Arc<AppState>>) -> ApiResult<Vec<MenuItem>> {
    let menus = brew_db::list_menus(&st.pool).await?;
    Ok(Json(ApiResponse::ok(menus)))
}

pub(crate) async fn get_menu(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<MenuItem> {
    let id = parse_id(&id)?;
    let menu = brew_db::get_menu(&st.pool, id).await?;
    Ok(Json(ApiResponse::ok(menu)))
}

pub(crate) async fn update_stock(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<StockLevel> {
    let id = parse_id(&id)?;
    let adjustment = StockAdjustment::from_json(&json_body(body)?)?;

    let level = brew_db::adjust_stock(&st.pool, id, adjustment).await?;
    st.publish(BusMsg::StockChanged {
        menu_id: level.id,
        stock: level.stock,
    });
    Ok(Json(ApiResponse::ok(level)))
}

pub(crate) async fn reset_stock(State(st): State<Arc<AppState>>) -> ApiResult<StockResetSummary> {
    let summary = brew_db::reset_all_stock(&st.pool).await?;
    st.publish(BusMsg::StockReset {
        updated_count: summary.updated_count,
    });
    Ok(Json(
        ApiResponse::ok(summary).with_message("all stock has been reset to 0"),
    ))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(crate) async fn list_orders(
    State(st): State<Arc<AppState>>,
    query: Result<Query<OrderListQuery>, QueryRejection>,
) -> ApiResult<Vec<Order>> {
    let q = query_params(query)?;
    let filter = OrderListFilter::from_query(q.tab.as_deref(), q.status.as_deref())?;
    let orders = brew_db::list_orders(&st.pool, filter).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    let id = parse_id(&id)?;
    let order = brew_db::get_order(&st.pool, id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrder>>), ApiError> {
    let order = parse_new_order(&json_body(body)?)?;

    let placed = brew_db::create_order(&st.pool, order, st.total_policy).await?;
    st.publish(BusMsg::OrderCreated {
        order_id: placed.id,
        total_amount: placed.total_amount,
    });
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(placed))))
}

pub(crate) async fn update_order_status(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<OrderStatusChange> {
    let id = parse_id(&id)?;
    let target = parse_status_target(&json_body(body)?)?;

    let change = brew_db::transition_order(&st.pool, id, target).await?;
    st.publish(BusMsg::OrderStatus {
        order_id: change.id,
        status: change.status,
        completed_time: change.completed_time,
    });
    Ok(Json(ApiResponse::ok(change)))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub(crate) async fn admin_login(
    State(st): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<()> {
    let body = json_body(body)?;
    brew_db::verify_admin_password(&st.pool, str_field(&body, "password")).await?;
    info!("admin authenticated");
    Ok(Json(ApiResponse::message_only("authenticated")))
}

pub(crate) async fn change_admin_password(
    State(st): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<PasswordChanged> {
    let body = json_body(body)?;
    let changed = brew_db::change_admin_password(
        &st.pool,
        str_field(&body, "old_password"),
        str_field(&body, "new_password"),
        st.password_rules,
    )
    .await?;
    Ok(Json(
        ApiResponse::ok(changed).with_message("password has been changed"),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
