//! `brew order ...` handlers.

use anyhow::Result;
use brew_db::OrderListFilter;
use sqlx::PgPool;

use super::{opt_dt, parse_order_status};

pub async fn list(pool: &PgPool, tab: Option<&str>, status: Option<&str>) -> Result<()> {
    let filter = OrderListFilter::from_query(tab, status)?;
    for o in brew_db::list_orders(pool, filter).await? {
        println!(
            "order_id={} status={} total_amount={} order_time={} completed_time={} lines={}",
            o.id,
            o.status,
            o.total_amount,
            o.order_time.to_rfc3339(),
            opt_dt(&o.completed_time),
            o.items.len()
        );
    }
    Ok(())
}

pub async fn show(pool: &PgPool, id: i32, json: bool) -> Result<()> {
    let o = brew_db::get_order(pool, id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&o)?);
        return Ok(());
    }

    println!("order_id={}", o.id);
    println!("status={}", o.status);
    println!("total_amount={}", o.total_amount);
    println!("order_time={}", o.order_time.to_rfc3339());
    println!("completed_time={}", opt_dt(&o.completed_time));
    for line in &o.items {
        let options: Vec<&str> = line.options.iter().map(|opt| opt.name.as_str()).collect();
        println!(
            "line menu_id={} menu_name={:?} quantity={} item_price={} options={:?}",
            line.menu_id,
            line.menu_name,
            line.quantity,
            line.item_price,
            options.join(",")
        );
    }
    Ok(())
}

pub async fn advance(pool: &PgPool, id: i32, to: &str) -> Result<()> {
    let target = parse_order_status(to)?;
    let change = brew_db::transition_order(pool, id, target).await?;
    println!(
        "order_id={} status={} completed_time={}",
        change.id,
        change.status,
        opt_dt(&change.completed_time)
    );
    Ok(())
}
