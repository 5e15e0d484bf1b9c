//! Starter menu for a fresh database.

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use crate::ServiceResult;

struct SeedMenu {
    name: &'static str,
    description: &'static str,
    price: i64,
    image_url: &'static str,
    stock: i32,
}

const SEED_MENUS: &[SeedMenu] = &[
    SeedMenu {
        name: "Americano (ICE)",
        description: "Chilled espresso over ice",
        price: 4000,
        image_url: "/americano-ice.jpg",
        stock: 10,
    },
    SeedMenu {
        name: "Americano (HOT)",
        description: "Espresso topped with hot water",
        price: 4000,
        image_url: "/americano-hot.jpg",
        stock: 10,
    },
    SeedMenu {
        name: "Caffe Latte",
        description: "Espresso with steamed milk",
        price: 5000,
        image_url: "/caffe-latte.jpg",
        stock: 10,
    },
    SeedMenu {
        name: "Caramel Macchiato",
        description: "Vanilla latte finished with caramel drizzle",
        price: 5500,
        image_url: "/caramel-macchiato.jpg",
        stock: 10,
    },
];

/// Options added to every seeded menu.
const SEED_OPTIONS: &[(&str, i64)] = &[("Extra shot", 500), ("Add syrup", 0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub menus_inserted: u64,
    pub options_inserted: u64,
}

/// Insert the starter menu if the `menus` table is empty. Idempotent: a second
/// call inserts nothing.
pub async fn seed_menus(pool: &PgPool) -> ServiceResult<SeedSummary> {
    let mut tx = pool.begin().await.context("seed_menus begin failed")?;

    // Serializes concurrent seeders; the emptiness check below is then exact.
    sqlx::query("lock table menus in share row exclusive mode")
        .execute(&mut *tx)
        .await
        .context("seed_menus lock failed")?;

    let (existing,): (i64,) = sqlx::query_as("select count(*)::bigint from menus")
        .fetch_one(&mut *tx)
        .await
        .context("seed_menus count failed")?;
    if existing > 0 {
        return Ok(SeedSummary {
            menus_inserted: 0,
            options_inserted: 0,
        });
    }

    let mut summary = SeedSummary {
        menus_inserted: 0,
        options_inserted: 0,
    };
    for m in SEED_MENUS {
        let menu_id: i32 = sqlx::query_scalar(
            r#"
            insert into menus (name, description, price, image_url, stock)
            values ($1, $2, $3, $4, $5)
            returning id
            "#,
        )
        .bind(m.name)
        .bind(m.description)
        .bind(m.price)
        .bind(m.image_url)
        .bind(m.stock)
        .fetch_one(&mut *tx)
        .await
        .context("seed_menus insert menu failed")?;
        summary.menus_inserted += 1;

        for (name, price) in SEED_OPTIONS {
            sqlx::query("insert into options (menu_id, name, additional_price) values ($1, $2, $3)")
                .bind(menu_id)
                .bind(*name)
                .bind(*price)
                .execute(&mut *tx)
                .await
                .context("seed_menus insert option failed")?;
            summary.options_inserted += 1;
        }
    }

    tx.commit().await.context("seed_menus commit failed")?;

    info!(
        menus = summary.menus_inserted,
        options = summary.options_inserted,
        "seed data inserted"
    );
    Ok(summary)
}
