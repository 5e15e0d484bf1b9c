//! `brew menu ...` handlers.

use anyhow::{bail, Result};
use brew_orders::StockAdjustment;
use sqlx::PgPool;

pub async fn list(pool: &PgPool) -> Result<()> {
    for m in brew_db::list_menus(pool).await? {
        println!(
            "menu_id={} name={:?} price={} stock={} image_url={}",
            m.id,
            m.name,
            m.price,
            m.stock,
            m.image_url.as_deref().unwrap_or("")
        );
        for o in &m.options {
            println!(
                "  option_id={} name={:?} additional_price={}",
                o.id, o.name, o.additional_price
            );
        }
    }
    Ok(())
}

pub async fn stock(pool: &PgPool, id: i32, change: Option<i64>, set: Option<i64>) -> Result<()> {
    let adjustment = match (change, set) {
        (Some(delta), None) => StockAdjustment::Change(delta),
        (None, Some(value)) => StockAdjustment::absolute(value)?,
        _ => bail!("provide exactly one of --change or --set"),
    };

    let level = brew_db::adjust_stock(pool, id, adjustment).await?;
    println!("menu_id={} stock={}", level.id, level.stock);
    Ok(())
}

pub async fn reset_stock(pool: &PgPool) -> Result<()> {
    let summary = brew_db::reset_all_stock(pool).await?;
    println!("updated_count={}", summary.updated_count);
    Ok(())
}

pub async fn set_image(pool: &PgPool, id: i32, url: Option<&str>) -> Result<()> {
    let menu = brew_db::set_menu_image(pool, id, url).await?;
    println!(
        "menu_id={} image_url={}",
        menu.id,
        menu.image_url.as_deref().unwrap_or("")
    );
    Ok(())
}
