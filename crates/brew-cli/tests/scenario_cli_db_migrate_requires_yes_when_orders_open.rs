use predicates::prelude::*;
use uuid::Uuid;

/// `brew db migrate` must refuse while any order is pending/in_progress unless --yes.
/// Advancing the order to completed through the CLI clears the guardrail again.
///
/// DB-backed test, skipped if BREW_DATABASE_URL is not set.
#[tokio::test]
async fn cli_db_migrate_requires_yes_when_orders_open() -> anyhow::Result<()> {
    let url = match std::env::var(brew_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: BREW_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("SKIP: cannot connect to DB: {e}");
            return Ok(());
        }
    };
    brew_db::migrate(&pool).await?;

    // Unique menu name avoids collisions with other tests / local data.
    let menu_id: i32 = sqlx::query_scalar(
        "insert into menus (name, price, stock) values ($1, 3000, 3) returning id",
    )
    .bind(format!("Flat White {}", Uuid::new_v4()))
    .fetch_one(&pool)
    .await?;

    let order: brew_schemas::NewOrder = serde_json::from_value(serde_json::json!({
        "items": [{"menu_id": menu_id, "quantity": 1, "item_price": 3000}],
        "total_amount": 3000
    }))?;
    let placed = brew_db::create_order(&pool, order, Default::default()).await?;
    let order_id = placed.id.to_string();

    // Without --yes => must fail with refusal message.
    assert_cmd::Command::cargo_bin("brew")?
        .env(brew_db::ENV_DB_URL, &url)
        .args(["db", "migrate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING MIGRATE"));

    // With --yes => should succeed.
    assert_cmd::Command::cargo_bin("brew")?
        .env(brew_db::ENV_DB_URL, &url)
        .args(["db", "migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    // Skipping a step is refused; walking forward works.
    assert_cmd::Command::cargo_bin("brew")?
        .env(brew_db::ENV_DB_URL, &url)
        .args(["order", "advance", "--id", &order_id, "--to", "completed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pending"));

    for (to, expect) in [("in-progress", "status=in_progress"), ("completed", "status=completed")] {
        assert_cmd::Command::cargo_bin("brew")?
            .env(brew_db::ENV_DB_URL, &url)
            .args(["order", "advance", "--id", &order_id, "--to", to])
            .assert()
            .success()
            .stdout(predicate::str::contains(expect));
    }

    // Stock adjustments through the CLI share the ledger's floor at zero.
    let id = menu_id.to_string();
    assert_cmd::Command::cargo_bin("brew")?
        .env(brew_db::ENV_DB_URL, &url)
        .args(["menu", "stock", "--id", &id, "--change", "-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("below 0"));
    assert_cmd::Command::cargo_bin("brew")?
        .env(brew_db::ENV_DB_URL, &url)
        .args(["menu", "stock", "--id", &id, "--change", "-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("menu_id={menu_id} stock=0")));

    Ok(())
}
