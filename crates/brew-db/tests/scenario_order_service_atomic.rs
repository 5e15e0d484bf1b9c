//! Scenario: order placement is all-or-nothing
//!
//! # Invariant under test
//!
//! - A valid order decrements each referenced menu by exactly its quantity.
//! - Any failing line (missing menu, short stock, foreign option, wrong total)
//!   leaves EVERY menu's stock unchanged and inserts no order.
//! - Lines naming the same menu are checked cumulatively.
//!
//! DB-backed test. Skips if `BREW_DATABASE_URL` is not set.

use brew_db::ServiceError;
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
        .max_connections(4)
        .connect(&url)
        .await?;
    brew_db::migrate(&pool).await?;
    Ok(Some(pool))
}

async fn insert_menu(pool: &PgPool, label: &str, price: i64, stock: i32) -> anyhow::Result<i32> {
    let name = format!("{label} {}", Uuid::new_v4());
    let id: i32 = sqlx::query_scalar(
        "insert into menus (name, price, stock) values ($1, $2, $3) returning id",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn insert_option(pool: &PgPool, menu_id: i32, price: i64) -> anyhow::Result<i32> {
    let id: i32 = sqlx::query_scalar(
        "insert into options (menu_id, name, additional_price) values ($1, 'Extra shot', $2) returning id",
    )
    .bind(menu_id)
    .bind(price)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn stock_of(pool: &PgPool, menu_id: i32) -> anyhow::Result<i32> {
    Ok(brew_db::get_menu(pool, menu_id).await?.stock)
}

fn line(menu_id: i32, quantity: i32, item_price: i64) -> NewOrderItem {
    NewOrderItem {
        menu_id,
        quantity,
        option_ids: vec![],
        item_price,
    }
}

#[tokio::test]
async fn five_in_stock_then_sold_out() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let menu = insert_menu(&pool, "Americano", 1000, 5).await?;

    let placed = brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![line(menu, 5, 1000)],
            total_amount: 5000,
        },
        TotalPolicy::Verify,
    )
    .await?;
    assert_eq!(placed.status, OrderStatus::Pending);
    assert_eq!(placed.total_amount, 5000);
    assert_eq!(stock_of(&pool, menu).await?, 0);

    let err = brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![line(menu, 1, 1000)],
            total_amount: 1000,
        },
        TotalPolicy::Verify,
    )
    .await
    .unwrap_err();
    match err {
        ServiceError::InsufficientStock {
            menu_id,
            stock,
            requested,
            ..
        } => {
            assert_eq!(menu_id, menu);
            assert_eq!(stock, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(&pool, menu).await?, 0);
    Ok(())
}

#[tokio::test]
async fn short_line_rolls_back_every_decrement() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let plenty = insert_menu(&pool, "Latte", 1000, 10).await?;
    let scarce = insert_menu(&pool, "Mocha", 1000, 2).await?;

    let err = brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![line(plenty, 3, 1000), line(scarce, 3, 1000)],
            total_amount: 6000,
        },
        TotalPolicy::Verify,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "insufficient_stock");

    assert_eq!(stock_of(&pool, plenty).await?, 10, "first line rolled back");
    assert_eq!(stock_of(&pool, scarce).await?, 2);
    Ok(())
}

#[tokio::test]
async fn unknown_menu_rolls_back_every_decrement() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let menu = insert_menu(&pool, "Latte", 1000, 10).await?;
    let (max_id,): (i32,) = sqlx::query_as("select coalesce(max(id), 0) from menus")
        .fetch_one(&pool)
        .await?;

    let err = brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![line(menu, 1, 1000), line(max_id + 1000, 1, 1000)],
            total_amount: 2000,
        },
        TotalPolicy::Trust,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert!(err.to_string().contains(&(max_id + 1000).to_string()));
    assert_eq!(stock_of(&pool, menu).await?, 10);
    Ok(())
}

#[tokio::test]
async fn same_menu_lines_share_one_stock_counter() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let menu = insert_menu(&pool, "Americano", 1000, 3).await?;

    let err = brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![line(menu, 2, 1000), line(menu, 2, 1000)],
            total_amount: 4000,
        },
        TotalPolicy::Verify,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "insufficient_stock");
    assert_eq!(stock_of(&pool, menu).await?, 3);

    brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![line(menu, 2, 1000), line(menu, 1, 1000)],
            total_amount: 3000,
        },
        TotalPolicy::Verify,
    )
    .await?;
    assert_eq!(stock_of(&pool, menu).await?, 0);
    Ok(())
}

#[tokio::test]
async fn options_must_belong_to_the_line_menu() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let latte = insert_menu(&pool, "Latte", 5000, 4).await?;
    let mocha = insert_menu(&pool, "Mocha", 5500, 4).await?;
    let mocha_shot = insert_option(&pool, mocha, 500).await?;

    let err = brew_db::create_order(
        &pool,
        NewOrder {
            items: vec![NewOrderItem {
                menu_id: latte,
                quantity: 1,
                option_ids: vec![mocha_shot],
                item_price: 5500,
            }],
            total_amount: 5500,
        },
        TotalPolicy::Trust,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert_eq!(stock_of(&pool, latte).await?, 4, "stock untouched");
    Ok(())
}

#[tokio::test]
async fn total_policy_verify_versus_trust() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let menu = insert_menu(&pool, "Latte", 5000, 10).await?;
    let shot = insert_option(&pool, menu, 500).await?;
    let order = |total| NewOrder {
        items: vec![NewOrderItem {
            menu_id: menu,
            quantity: 2,
            option_ids: vec![shot, shot],
            item_price: 11000,
        }],
        total_amount: total,
    };

    let err = brew_db::create_order(&pool, order(10000), TotalPolicy::Verify)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert!(err.to_string().contains("11000"), "{err}");
    assert_eq!(stock_of(&pool, menu).await?, 10);

    let placed = brew_db::create_order(&pool, order(11000), TotalPolicy::Verify).await?;
    assert_eq!(placed.total_amount, 11000);

    let trusted = brew_db::create_order(&pool, order(1), TotalPolicy::Trust).await?;
    assert_eq!(trusted.total_amount, 1);
    assert_eq!(stock_of(&pool, menu).await?, 6);

    // Duplicate option ids were stored once.
    let detail = brew_db::get_order(&pool, placed.id).await?;
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 2);
    assert_eq!(detail.items[0].item_price, 11000);
    assert_eq!(detail.items[0].options.len(), 1);
    assert_eq!(detail.items[0].options[0].id, shot);
    assert!(detail.items[0].menu_name.starts_with("Latte"));
    assert!(detail.completed_time.is_none());
    Ok(())
}

#[tokio::test]
async fn concurrent_orders_for_the_last_unit() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let menu = insert_menu(&pool, "Americano", 1000, 1).await?;
    let order = || NewOrder {
        items: vec![line(menu, 1, 1000)],
        total_amount: 1000,
    };

    let (a, b) = tokio::join!(
        brew_db::create_order(&pool, order(), TotalPolicy::Verify),
        brew_db::create_order(&pool, order(), TotalPolicy::Verify),
    );
    let ok = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
    assert_eq!(ok, 1, "exactly one order gets the last unit");
    for r in [a, b] {
        if let Err(e) = r {
            assert_eq!(e.kind(), "insufficient_stock");
        }
    }
    assert_eq!(stock_of(&pool, menu).await?, 0);
    Ok(())
}
