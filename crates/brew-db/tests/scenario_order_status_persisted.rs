//! Scenario: order status machine persisted
//!
//! # Invariant under test
//!
//! - `pending -> in_progress -> completed` succeeds and only the last step
//!   stamps `completed_time`.
//! - Skipping, going backward and leaving `completed` fail with
//!   `InvalidTransition` and change nothing.
//! - Listing filters place the order in the matching tab.
//!
//! DB-backed test. Skips if `BREW_DATABASE_URL` is not set.

use brew_db::{OrderListFilter, ServiceError};
use brew_orders::TotalPolicy;
use brew_schemas::{NewOrder, NewOrderItem, OrderStatus};
use sqlx::PgPool;
use uuid::Uuid;

async fn pool_or_skip() -> anyhow::Result<Option<PgPool>> {
    let url = match std::env::var(brew_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {} not set", brew_db::ENV_DB_URL);
            return Ok(None);
        }
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    brew_db::migrate(&pool).await?;
    Ok(Some(pool))
}

async fn place_order(pool: &PgPool) -> anyhow::Result<i32> {
    let menu_id: i32 = sqlx::query_scalar(
        "insert into menus (name, price, stock) values ($1, 4000, 5) returning id",
    )
    .bind(format!("Americano {}", Uuid::new_v4()))
    .fetch_one(pool)
    .await?;

    let placed = brew_db::create_order(
        pool,
        NewOrder {
            items: vec![NewOrderItem {
                menu_id,
                quantity: 1,
                option_ids: vec![],
                item_price: 4000,
            }],
            total_amount: 4000,
        },
        TotalPolicy::Verify,
    )
    .await?;
    Ok(placed.id)
}

async fn listed(pool: &PgPool, filter: OrderListFilter, id: i32) -> anyhow::Result<bool> {
    Ok(brew_db::list_orders(pool, filter)
        .await?
        .iter()
        .any(|o| o.id == id))
}

#[tokio::test]
async fn forward_path_stamps_completion_once() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let id = place_order(&pool).await?;
    assert!(listed(&pool, OrderListFilter::InProgressTab, id).await?);
    assert!(listed(&pool, OrderListFilter::Status(OrderStatus::Pending), id).await?);

    let started = brew_db::transition_order(&pool, id, OrderStatus::InProgress).await?;
    assert_eq!(started.status, OrderStatus::InProgress);
    assert!(started.completed_time.is_none());
    assert!(listed(&pool, OrderListFilter::InProgressTab, id).await?);
    assert!(!listed(&pool, OrderListFilter::CompletedTab, id).await?);

    let done = brew_db::transition_order(&pool, id, OrderStatus::Completed).await?;
    assert_eq!(done.status, OrderStatus::Completed);
    let completed_at = done.completed_time.expect("completion stamped");

    let order = brew_db::get_order(&pool, id).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.completed_time, Some(completed_at));
    assert!(order.completed_time >= Some(order.order_time));

    assert!(listed(&pool, OrderListFilter::CompletedTab, id).await?);
    assert!(!listed(&pool, OrderListFilter::InProgressTab, id).await?);
    assert!(listed(&pool, OrderListFilter::All, id).await?);
    Ok(())
}

#[tokio::test]
async fn illegal_moves_change_nothing() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let id = place_order(&pool).await?;

    // Skip ahead.
    let err = brew_db::transition_order(&pool, id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Completed
        }
    ));
    // Self-loop.
    assert!(brew_db::transition_order(&pool, id, OrderStatus::Pending)
        .await
        .is_err());
    assert_eq!(brew_db::get_order(&pool, id).await?.status, OrderStatus::Pending);

    brew_db::transition_order(&pool, id, OrderStatus::InProgress).await?;
    // Backward.
    let err = brew_db::transition_order(&pool, id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_transition");

    brew_db::transition_order(&pool, id, OrderStatus::Completed).await?;
    // Terminal.
    for target in OrderStatus::ALL {
        let err = brew_db::transition_order(&pool, id, target)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }
    let order = brew_db::get_order(&pool, id).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.completed_time.is_some());
    Ok(())
}

#[tokio::test]
async fn unknown_order_is_not_found() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let (max_id,): (i32,) = sqlx::query_as("select coalesce(max(id), 0) from orders")
        .fetch_one(&pool)
        .await?;
    let missing = max_id + 1000;

    let err = brew_db::transition_order(&pool, missing, OrderStatus::InProgress)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
    let err = brew_db::get_order(&pool, missing).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    Ok(())
}

#[tokio::test]
async fn db_rejects_completion_time_on_open_orders() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let mut tx = pool.begin().await?;
    let err = sqlx::query(
        "insert into orders (status, total_amount, completed_time) values ('pending', 0, now())",
    )
    .execute(&mut *tx)
    .await
    .unwrap_err();
    let code = match &err {
        sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
        _ => None,
    };
    assert_eq!(code.as_deref(), Some("23514"), "check_violation: {err:?}");
    let _ = tx.rollback().await;
    Ok(())
}
