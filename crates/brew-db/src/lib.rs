//! brew-db
//!
//! Postgres persistence for menus, orders and settings. Every state-changing
//! operation runs in its own transaction; a dropped transaction rolls back, so
//! an early `?` return leaves no partial writes behind.

mod error;
mod menus;
mod orders;
mod seed;
mod settings;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub use error::{ServiceError, ServiceResult};
pub use menus::{adjust_stock, get_menu, list_menus, reset_all_stock, set_menu_image};
pub use orders::{create_order, get_order, list_orders, transition_order, OrderListFilter};
pub use seed::{seed_menus, SeedSummary};
pub use settings::{
    admin_password_history, bootstrap_admin_password, change_admin_password, hash_password,
    password_matches, verify_admin_password, PasswordRules, SettingRevision,
    ADMIN_PASSWORD_KEY,
};

pub const ENV_DB_URL: &str = "BREW_DATABASE_URL";

/// Connect to Postgres using BREW_DATABASE_URL and default pool settings.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 10, Duration::from_secs(2)).await
}

pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Count orders still being worked on (pending or in_progress).
/// Used by the CLI migration guardrail.
pub async fn count_open_orders(pool: &PgPool) -> Result<i64> {
    // No schema yet means nothing is open.
    let st = status(pool).await?;
    if !st.has_orders_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)::bigint
        from orders
        where status in ('pending', 'in_progress')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("count_open_orders failed")?;

    Ok(n)
}

pub async fn has_open_orders(pool: &PgPool) -> Result<bool> {
    Ok(count_open_orders(pool).await? > 0)
}
