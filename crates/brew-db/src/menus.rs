//! Menu reads and the stock ledger.

use std::collections::BTreeMap;

use anyhow::Context;
use brew_orders::StockAdjustment;
use brew_schemas::{MenuItem, MenuOption, StockLevel, StockResetSummary};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::info;

use crate::{ServiceError, ServiceResult};

fn menu_from_row(row: &PgRow) -> Result<MenuItem, sqlx::Error> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        stock: row.try_get("stock")?,
        options: Vec::new(),
    })
}

/// Options of the given menus, grouped by menu id, each group ascending by id.
async fn options_by_menu(
    pool: &PgPool,
    menu_ids: &[i32],
) -> ServiceResult<BTreeMap<i32, Vec<MenuOption>>> {
    let rows = sqlx::query(
        r#"
        select id, menu_id, name, additional_price
        from options
        where menu_id = any($1)
        order by menu_id, id
        "#,
    )
    .bind(menu_ids)
    .fetch_all(pool)
    .await
    .context("options_by_menu failed")?;

    let mut out: BTreeMap<i32, Vec<MenuOption>> = BTreeMap::new();
    for row in rows {
        let menu_id: i32 = row.try_get("menu_id")?;
        out.entry(menu_id).or_default().push(MenuOption {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            additional_price: row.try_get("additional_price")?,
        });
    }
    Ok(out)
}

/// All menus ascending by id, each with its options and current stock.
pub async fn list_menus(pool: &PgPool) -> ServiceResult<Vec<MenuItem>> {
    let rows = sqlx::query(
        r#"
        select id, name, description, price, image_url, stock
        from menus
        order by id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_menus failed")?;

    let mut menus = rows
        .iter()
        .map(menu_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let ids: Vec<i32> = menus.iter().map(|m| m.id).collect();
    let mut options = options_by_menu(pool, &ids).await?;
    for m in &mut menus {
        m.options = options.remove(&m.id).unwrap_or_default();
    }
    Ok(menus)
}

pub async fn get_menu(pool: &PgPool, menu_id: i32) -> ServiceResult<MenuItem> {
    let row = sqlx::query(
        r#"
        select id, name, description, price, image_url, stock
        from menus
        where id = $1
        "#,
    )
    .bind(menu_id)
    .fetch_optional(pool)
    .await
    .context("get_menu failed")?
    .ok_or_else(|| ServiceError::not_found(format!("menu not found: id {menu_id}")))?;

    let mut menu = menu_from_row(&row)?;
    menu.options = options_by_menu(pool, &[menu_id])
        .await?
        .remove(&menu_id)
        .unwrap_or_default();
    Ok(menu)
}

/// Apply a direct stock adjustment.
///
/// The current stock is read under a row lock in the same transaction as the
/// write, so concurrent relative changes never lose an update.
pub async fn adjust_stock(
    pool: &PgPool,
    menu_id: i32,
    adjustment: StockAdjustment,
) -> ServiceResult<StockLevel> {
    let mut tx = pool.begin().await.context("adjust_stock begin failed")?;

    let current: i32 = sqlx::query_scalar("select stock from menus where id = $1 for update")
        .bind(menu_id)
        .fetch_optional(&mut *tx)
        .await
        .context("adjust_stock lock failed")?
        .ok_or_else(|| ServiceError::not_found(format!("menu not found: id {menu_id}")))?;

    let stock = adjustment.apply(current)?;

    sqlx::query("update menus set stock = $2, updated_at = now() where id = $1")
        .bind(menu_id)
        .bind(stock)
        .execute(&mut *tx)
        .await
        .context("adjust_stock update failed")?;

    tx.commit().await.context("adjust_stock commit failed")?;

    info!(menu_id, from = current, to = stock, "stock adjusted");
    Ok(StockLevel { id: menu_id, stock })
}

/// Set every menu's stock to 0.
pub async fn reset_all_stock(pool: &PgPool) -> ServiceResult<StockResetSummary> {
    let rows = sqlx::query(
        r#"
        update menus
        set stock = 0, updated_at = now()
        returning id, stock
        "#,
    )
    .fetch_all(pool)
    .await
    .context("reset_all_stock failed")?;

    let mut menus = rows
        .iter()
        .map(|r| {
            Ok(StockLevel {
                id: r.try_get("id")?,
                stock: r.try_get("stock")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;
    menus.sort_by_key(|m| m.id);

    info!(updated = menus.len(), "stock reset to zero");
    Ok(StockResetSummary {
        updated_count: menus.len() as u64,
        menus,
    })
}

/// Replace a menu's image reference (`None` clears it).
pub async fn set_menu_image(
    pool: &PgPool,
    menu_id: i32,
    image_url: Option<&str>,
) -> ServiceResult<MenuItem> {
    let updated = sqlx::query("update menus set image_url = $2, updated_at = now() where id = $1")
        .bind(menu_id)
        .bind(image_url)
        .execute(pool)
        .await
        .context("set_menu_image failed")?
        .rows_affected();

    if updated == 0 {
        return Err(ServiceError::not_found(format!("menu not found: id {menu_id}")));
    }

    info!(menu_id, image_url, "menu image updated");
    get_menu(pool, menu_id).await
}
