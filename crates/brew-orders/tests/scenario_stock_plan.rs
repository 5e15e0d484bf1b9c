//! Scenario: per-order stock planning
//!
//! # Invariant under test
//!
//! - Each line's check sees the decrements of earlier lines of the same order.
//! - A plan either covers every line or fails on the first offending line;
//!   the snapshot itself is never mutated.
//! - A missing menu anywhere in the order fails the whole plan.

use brew_orders::{plan_stock, MenuStock, StockPlanError, StockSnapshot};
use brew_schemas::NewOrderItem;

fn snapshot(rows: &[(i32, &str, i32)]) -> StockSnapshot {
    rows.iter()
        .map(|(id, name, stock)| {
            (
                *id,
                MenuStock {
                    name: name.to_string(),
                    price: 1000,
                    stock: *stock,
                },
            )
        })
        .collect()
}

fn item(menu_id: i32, quantity: i32) -> NewOrderItem {
    NewOrderItem {
        menu_id,
        quantity,
        option_ids: vec![],
        item_price: 1000,
    }
}

#[test]
fn exact_stock_is_consumed_to_zero() {
    let snap = snapshot(&[(1, "Americano", 5)]);
    let plan = plan_stock(&[item(1, 5)], &snap).unwrap();
    assert_eq!(plan.updates().collect::<Vec<_>>(), vec![(1, 0)]);
}

#[test]
fn decrements_each_menu_by_its_total_quantity() {
    let snap = snapshot(&[(1, "Americano", 10), (2, "Latte", 3), (3, "Mocha", 7)]);
    let plan = plan_stock(&[item(2, 1), item(1, 4), item(2, 2), item(1, 1)], &snap).unwrap();

    // Menu 3 was never touched and is not in the plan.
    assert_eq!(plan.updates().collect::<Vec<_>>(), vec![(1, 5), (2, 0)]);
}

#[test]
fn two_lines_cannot_share_the_last_unit() {
    let snap = snapshot(&[(1, "Americano", 1)]);
    let err = plan_stock(&[item(1, 1), item(1, 1)], &snap).unwrap_err();

    match err {
        StockPlanError::Insufficient(s) => {
            assert_eq!(s.menu_id, 1);
            assert_eq!(s.name, "Americano");
            assert_eq!(s.stock, 0, "second line sees the first line's decrement");
            assert_eq!(s.requested, 1);
        }
        other => panic!("expected Insufficient, got {other:?}"),
    }
    assert_eq!(snap[&1].stock, 1, "snapshot is untouched");
}

#[test]
fn first_offending_line_wins() {
    let snap = snapshot(&[(1, "Americano", 0), (2, "Latte", 5)]);
    // Line 0 is fine, line 1 references a missing menu, line 2 is short.
    let err = plan_stock(&[item(2, 1), item(99, 1), item(1, 1)], &snap).unwrap_err();
    assert_eq!(err, StockPlanError::MissingMenu { menu_id: 99 });
}

#[test]
fn shortfall_reports_current_stock_and_request() {
    let snap = snapshot(&[(1, "Latte", 2)]);
    let err = plan_stock(&[item(1, 3)], &snap).unwrap_err();
    assert_eq!(err.to_string(), "insufficient stock: Latte (stock: 2, requested: 3)");
}

#[test]
fn plan_result_does_not_depend_on_line_order() {
    let snap = snapshot(&[(1, "Americano", 10), (2, "Latte", 10)]);
    let a = plan_stock(&[item(1, 2), item(2, 3), item(1, 1)], &snap).unwrap();
    let b = plan_stock(&[item(1, 1), item(1, 2), item(2, 3)], &snap).unwrap();
    assert_eq!(a, b);
}
