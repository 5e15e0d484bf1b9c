//! Order placement, status transitions and order reads.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context};
use brew_orders::{
    check_transition, line_total, order_total, plan_stock, unit_price, validate_new_order,
    verify_total, MenuStock, StockSnapshot, TotalPolicy,
};
use brew_schemas::{
    MenuOption, NewOrder, Order, OrderLine, OrderStatus, OrderStatusChange, PlacedOrder,
};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::info;

use crate::{ServiceError, ServiceResult};

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Place an order: check and decrement stock for every line, then insert the
/// order, its lines and their options. All or nothing.
///
/// Every menu the order touches is locked (`FOR UPDATE`, ascending id) before
/// any check runs, so two orders racing for the last unit serialize and the
/// loser sees the decremented stock.
pub async fn create_order(
    pool: &PgPool,
    order: NewOrder,
    policy: TotalPolicy,
) -> ServiceResult<PlacedOrder> {
    let order = validate_new_order(order)?;

    let mut menu_ids: Vec<i32> = order.items.iter().map(|i| i.menu_id).collect();
    menu_ids.sort_unstable();
    menu_ids.dedup();

    let mut tx = pool.begin().await.context("create_order begin failed")?;

    let rows = sqlx::query(
        r#"
        select id, name, price, stock
        from menus
        where id = any($1)
        order by id
        for update
        "#,
    )
    .bind(&menu_ids[..])
    .fetch_all(&mut *tx)
    .await
    .context("create_order lock menus failed")?;

    let mut snapshot = StockSnapshot::new();
    for row in &rows {
        snapshot.insert(
            row.try_get("id")?,
            MenuStock {
                name: row.try_get("name")?,
                price: row.try_get("price")?,
                stock: row.try_get("stock")?,
            },
        );
    }

    let plan = plan_stock(&order.items, &snapshot)?;

    // Options: each id must exist and belong to its line's menu.
    let mut option_ids: Vec<i32> = order
        .items
        .iter()
        .flat_map(|i| i.option_ids.iter().copied())
        .collect();
    option_ids.sort_unstable();
    option_ids.dedup();

    let mut options: HashMap<i32, (i32, i64)> = HashMap::new();
    if !option_ids.is_empty() {
        let rows = sqlx::query("select id, menu_id, additional_price from options where id = any($1)")
            .bind(&option_ids[..])
            .fetch_all(&mut *tx)
            .await
            .context("create_order load options failed")?;
        for row in rows {
            options.insert(
                row.try_get("id")?,
                (row.try_get("menu_id")?, row.try_get("additional_price")?),
            );
        }
    }

    let mut lines: Vec<(i64, i32)> = Vec::with_capacity(order.items.len());
    for (idx, item) in order.items.iter().enumerate() {
        let mut extra = Vec::with_capacity(item.option_ids.len());
        for oid in &item.option_ids {
            match options.get(oid) {
                Some((menu_id, price)) if *menu_id == item.menu_id => extra.push(*price),
                Some(_) => {
                    return Err(ServiceError::validation(format!(
                        "items[{idx}].option_ids: option {oid} does not belong to menu {}",
                        item.menu_id
                    )))
                }
                None => {
                    return Err(ServiceError::validation(format!(
                        "items[{idx}].option_ids: option {oid} does not exist"
                    )))
                }
            }
        }
        // plan_stock already proved the menu is in the snapshot.
        let base = snapshot
            .get(&item.menu_id)
            .map(|m| m.price)
            .ok_or_else(|| anyhow!("menu {} vanished from locked snapshot", item.menu_id))?;
        let unit = unit_price(base, extra)
            .ok_or_else(|| ServiceError::validation(format!("items[{idx}] price is out of range")))?;
        line_total(unit, item.quantity)
            .ok_or_else(|| ServiceError::validation(format!("items[{idx}] total is out of range")))?;
        lines.push((unit, item.quantity));
    }
    let computed = order_total(lines)
        .ok_or_else(|| ServiceError::validation("order total is out of range"))?;
    verify_total(policy, order.total_amount, computed)?;

    for (menu_id, stock) in plan.updates() {
        sqlx::query("update menus set stock = $2, updated_at = now() where id = $1")
            .bind(menu_id)
            .bind(stock)
            .execute(&mut *tx)
            .await
            .context("create_order stock update failed")?;
    }

    let row = sqlx::query(
        r#"
        insert into orders (status, total_amount)
        values ('pending', $1)
        returning id, order_time
        "#,
    )
    .bind(order.total_amount)
    .fetch_one(&mut *tx)
    .await
    .context("create_order insert order failed")?;
    let order_id: i32 = row.try_get("id")?;
    let order_time: DateTime<Utc> = row.try_get("order_time")?;

    for item in &order.items {
        let item_id: i32 = sqlx::query_scalar(
            r#"
            insert into order_items (order_id, menu_id, quantity, item_price)
            values ($1, $2, $3, $4)
            returning id
            "#,
        )
        .bind(order_id)
        .bind(item.menu_id)
        .bind(item.quantity)
        .bind(item.item_price)
        .fetch_one(&mut *tx)
        .await
        .context("create_order insert item failed")?;

        for oid in &item.option_ids {
            sqlx::query("insert into order_item_options (order_item_id, option_id) values ($1, $2)")
                .bind(item_id)
                .bind(*oid)
                .execute(&mut *tx)
                .await
                .context("create_order insert item option failed")?;
        }
    }

    tx.commit().await.context("create_order commit failed")?;

    info!(
        order_id,
        total_amount = order.total_amount,
        lines = order.items.len(),
        "order created"
    );
    Ok(PlacedOrder {
        id: order_id,
        order_time,
        status: OrderStatus::Pending,
        total_amount: order.total_amount,
    })
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Move an order one step forward. The current status is read under a row
/// lock, so two concurrent transitions on one order cannot both succeed from
/// the same starting state.
pub async fn transition_order(
    pool: &PgPool,
    order_id: i32,
    target: OrderStatus,
) -> ServiceResult<OrderStatusChange> {
    let mut tx = pool.begin().await.context("transition_order begin failed")?;

    let current: String = sqlx::query_scalar("select status from orders where id = $1 for update")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .context("transition_order lock failed")?
        .ok_or_else(|| ServiceError::not_found(format!("order not found: id {order_id}")))?;

    let from = parse_status(&current)?;
    let change = check_transition(from, target)?;

    let sql = if change.stamps_completion() {
        "update orders set status = $2, completed_time = now() where id = $1 returning completed_time"
    } else {
        "update orders set status = $2 where id = $1 returning completed_time"
    };
    let completed_time: Option<DateTime<Utc>> = sqlx::query_scalar(sql)
        .bind(order_id)
        .bind(target.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("transition_order update failed")?;

    tx.commit().await.context("transition_order commit failed")?;

    info!(order_id, from = %from, to = %target, "order status changed");
    Ok(OrderStatusChange {
        id: order_id,
        status: target,
        completed_time,
    })
}

fn parse_status(s: &str) -> anyhow::Result<OrderStatus> {
    OrderStatus::parse(s).ok_or_else(|| anyhow!("unknown order status in db: {s}"))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Which orders `list_orders` returns and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderListFilter {
    /// Every order, newest first.
    All,
    /// One status, newest first.
    Status(OrderStatus),
    /// pending + in_progress, oldest first (work queue order).
    InProgressTab,
    /// completed, most recently completed first.
    CompletedTab,
}

impl OrderListFilter {
    /// Build from the `tab` and `status` query parameters. `tab` wins when both
    /// are present; blank values count as absent.
    pub fn from_query(tab: Option<&str>, status: Option<&str>) -> ServiceResult<Self> {
        let tab = tab.map(str::trim).filter(|s| !s.is_empty());
        let status = status.map(str::trim).filter(|s| !s.is_empty());

        if let Some(tab) = tab {
            return match tab {
                "in-progress" => Ok(OrderListFilter::InProgressTab),
                "completed" => Ok(OrderListFilter::CompletedTab),
                other => Err(ServiceError::validation(format!(
                    "unknown tab '{other}' (expected in-progress or completed)"
                ))),
            };
        }
        match status {
            None => Ok(OrderListFilter::All),
            Some(s) => OrderStatus::parse(s).map(OrderListFilter::Status).ok_or_else(|| {
                ServiceError::validation(format!(
                    "unknown status '{s}' (expected pending, in_progress or completed)"
                ))
            }),
        }
    }
}

const ORDER_COLUMNS: &str = "select id, order_time, completed_time, status, total_amount from orders";

impl OrderListFilter {
    fn sql(&self) -> String {
        let tail = match self {
            OrderListFilter::All => "order by order_time desc, id desc",
            OrderListFilter::Status(_) => "where status = $1 order by order_time desc, id desc",
            OrderListFilter::InProgressTab => {
                "where status in ('pending', 'in_progress') order by order_time asc, id asc"
            }
            OrderListFilter::CompletedTab => {
                "where status = 'completed' \
                 order by coalesce(completed_time, order_time) desc, id desc"
            }
        };
        format!("{ORDER_COLUMNS} {tail}")
    }
}

pub async fn list_orders(pool: &PgPool, filter: OrderListFilter) -> ServiceResult<Vec<Order>> {
    let sql = filter.sql();
    let mut query = sqlx::query(&sql);
    if let OrderListFilter::Status(s) = filter {
        query = query.bind(s.as_str());
    }
    let rows = query.fetch_all(pool).await.context("list_orders failed")?;

    let orders = rows
        .iter()
        .map(order_from_row)
        .collect::<ServiceResult<Vec<_>>>()?;
    attach_lines(pool, orders).await
}

pub async fn get_order(pool: &PgPool, order_id: i32) -> ServiceResult<Order> {
    let row = sqlx::query(&format!("{ORDER_COLUMNS} where id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await
        .context("get_order failed")?
        .ok_or_else(|| ServiceError::not_found(format!("order not found: id {order_id}")))?;

    let order = order_from_row(&row)?;
    let mut orders = attach_lines(pool, vec![order]).await?;
    orders
        .pop()
        .ok_or_else(|| ServiceError::Unexpected(anyhow!("get_order lost order {order_id}")))
}

fn order_from_row(row: &PgRow) -> ServiceResult<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        order_time: row.try_get("order_time")?,
        completed_time: row.try_get("completed_time")?,
        status: parse_status(&status)?,
        total_amount: row.try_get("total_amount")?,
        items: Vec::new(),
    })
}

/// Load lines (with menu names and selected options) for `orders`, keeping the
/// caller's order of orders. Lines and options are ascending by id.
async fn attach_lines(pool: &PgPool, mut orders: Vec<Order>) -> ServiceResult<Vec<Order>> {
    if orders.is_empty() {
        return Ok(orders);
    }
    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();

    let rows = sqlx::query(
        r#"
        select oi.id, oi.order_id, oi.menu_id, m.name as menu_name, oi.quantity, oi.item_price
        from order_items oi
        join menus m on m.id = oi.menu_id
        where oi.order_id = any($1)
        order by oi.order_id, oi.id
        "#,
    )
    .bind(&order_ids[..])
    .fetch_all(pool)
    .await
    .context("attach_lines items failed")?;

    let mut lines: BTreeMap<i32, Vec<OrderLine>> = BTreeMap::new();
    let mut item_ids: Vec<i32> = Vec::with_capacity(rows.len());
    for row in rows {
        let order_id: i32 = row.try_get("order_id")?;
        let line = OrderLine {
            id: row.try_get("id")?,
            menu_id: row.try_get("menu_id")?,
            menu_name: row.try_get("menu_name")?,
            quantity: row.try_get("quantity")?,
            item_price: row.try_get("item_price")?,
            options: Vec::new(),
        };
        item_ids.push(line.id);
        lines.entry(order_id).or_default().push(line);
    }

    let mut chosen: HashMap<i32, Vec<MenuOption>> = HashMap::new();
    if !item_ids.is_empty() {
        let rows = sqlx::query(
            r#"
            select oio.order_item_id, o.id, o.name, o.additional_price
            from order_item_options oio
            join options o on o.id = oio.option_id
            where oio.order_item_id = any($1)
            order by oio.order_item_id, o.id
            "#,
        )
        .bind(&item_ids[..])
        .fetch_all(pool)
        .await
        .context("attach_lines options failed")?;

        for row in rows {
            let item_id: i32 = row.try_get("order_item_id")?;
            chosen.entry(item_id).or_default().push(MenuOption {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                additional_price: row.try_get("additional_price")?,
            });
        }
    }

    for order in &mut orders {
        let mut items = lines.remove(&order.id).unwrap_or_default();
        for line in &mut items {
            line.options = chosen.remove(&line.id).unwrap_or_default();
        }
        order.items = items;
    }
    Ok(orders)
}
