//! `brew admin ...` handlers. Password values are never printed.

use anyhow::{Context, Result};
use brew_config::AppConfig;
use brew_db::PasswordRules;
use sqlx::PgPool;

pub async fn bootstrap(pool: &PgPool, cfg: &AppConfig, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => brew_config::resolve_secrets(cfg)?
            .admin_bootstrap_password
            .with_context(|| {
                format!(
                    "no --password given and env var '{}' is not set",
                    cfg.admin.bootstrap_password_env
                )
            })?,
    };

    let stored = brew_db::bootstrap_admin_password(pool, &password).await?;
    println!("bootstrapped={}", stored);
    Ok(())
}

pub async fn set_password(pool: &PgPool, cfg: &AppConfig, old: &str, new: &str) -> Result<()> {
    let rules = PasswordRules {
        length: cfg.admin.password_length,
    };
    let changed = brew_db::change_admin_password(pool, old, new, rules).await?;
    println!("password_changed=true changed_at={}", changed.changed_at.to_rfc3339());
    Ok(())
}

pub async fn history(pool: &PgPool) -> Result<()> {
    for rev in brew_db::admin_password_history(pool).await? {
        println!("revision_id={} changed_at={}", rev.id, rev.changed_at.to_rfc3339());
    }
    Ok(())
}
