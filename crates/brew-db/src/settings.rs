//! Versioned admin password.
//!
//! `settings` is append-only: rotating the password inserts a new row and the
//! row with the highest id for a key is its current value. Writers hold an
//! advisory lock, so ids follow commit order even when `changed_at` does not. Values are salted SHA-256
//! digests in the form `sha256$<salt>$<hex>`.

use anyhow::{anyhow, Context};
use brew_schemas::PasswordChanged;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ServiceError, ServiceResult};

pub const ADMIN_PASSWORD_KEY: &str = "admin_password";

/// Key for `pg_advisory_xact_lock`; serializes writers of the admin password.
const ADMIN_PASSWORD_LOCK: i64 = 0x6272_6577_6164_6d6e;

const HASH_SCHEME: &str = "sha256";

/// Rules applied to a new password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRules {
    /// Exact length in characters.
    pub length: usize,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self { length: 6 }
    }
}

/// One row of the password history. The value itself is never exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRevision {
    pub id: i64,
    pub changed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

fn digest_hex(salt: &str, plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

/// Salted digest of `plain`, ready to store.
pub fn hash_password(plain: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest_hex(&salt, plain);
    format!("{HASH_SCHEME}${salt}${digest}")
}

/// Does `candidate` match a value produced by [`hash_password`]?
pub fn password_matches(stored: &str, candidate: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(digest)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let computed = digest_hex(salt, candidate);
    // Length is public (fixed-size hex); compare every byte regardless.
    computed.len() == digest.len()
        && computed
            .bytes()
            .zip(digest.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

async fn current_value(tx: &mut Transaction<'_, Postgres>) -> ServiceResult<Option<String>> {
    let value: Option<String> = sqlx::query_scalar(
        r#"
        select value
        from settings
        where key = $1
        order by id desc
        limit 1
        "#,
    )
    .bind(ADMIN_PASSWORD_KEY)
    .fetch_optional(&mut **tx)
    .await
    .context("read admin password failed")?;
    Ok(value)
}

async fn lock_admin_password(tx: &mut Transaction<'_, Postgres>) -> ServiceResult<()> {
    sqlx::query("select pg_advisory_xact_lock($1)")
        .bind(ADMIN_PASSWORD_LOCK)
        .execute(&mut **tx)
        .await
        .context("admin password lock failed")?;
    Ok(())
}

fn not_configured() -> ServiceError {
    ServiceError::Unexpected(anyhow!("admin password is not configured"))
}

/// Check `candidate` against the current admin password.
pub async fn verify_admin_password(pool: &PgPool, candidate: &str) -> ServiceResult<()> {
    if candidate.is_empty() {
        return Err(ServiceError::validation("password is required"));
    }

    let mut tx = pool.begin().await.context("verify_admin_password begin failed")?;
    let stored = current_value(&mut tx).await?.ok_or_else(not_configured)?;
    tx.commit().await.context("verify_admin_password commit failed")?;

    if !password_matches(&stored, candidate) {
        warn!("admin password rejected");
        return Err(ServiceError::Auth("incorrect password".to_string()));
    }
    Ok(())
}

/// Rotate the admin password. Appends a history row; never updates in place.
pub async fn change_admin_password(
    pool: &PgPool,
    old_password: &str,
    new_password: &str,
    rules: PasswordRules,
) -> ServiceResult<PasswordChanged> {
    if old_password.is_empty() || new_password.is_empty() {
        return Err(ServiceError::validation(
            "old_password and new_password are required",
        ));
    }
    if new_password.chars().count() != rules.length {
        return Err(ServiceError::validation(format!(
            "new password must be exactly {} characters",
            rules.length
        )));
    }

    let mut tx = pool.begin().await.context("change_admin_password begin failed")?;
    lock_admin_password(&mut tx).await?;

    let stored = current_value(&mut tx).await?.ok_or_else(not_configured)?;
    if !password_matches(&stored, old_password) {
        warn!("admin password change rejected: current password mismatch");
        return Err(ServiceError::Auth("current password is incorrect".to_string()));
    }
    if old_password == new_password {
        return Err(ServiceError::validation(
            "new password must differ from the current password",
        ));
    }

    let row = sqlx::query(
        r#"
        insert into settings (key, value)
        values ($1, $2)
        returning id, changed_at
        "#,
    )
    .bind(ADMIN_PASSWORD_KEY)
    .bind(hash_password(new_password))
    .fetch_one(&mut *tx)
    .await
    .context("change_admin_password insert failed")?;
    let id: i64 = row.try_get("id")?;
    let changed_at: DateTime<Utc> = row.try_get("changed_at")?;

    tx.commit().await.context("change_admin_password commit failed")?;

    info!(revision = id, "admin password changed");
    Ok(PasswordChanged { changed_at })
}

/// Store the first admin password. Does nothing (returns `false`) once any
/// history exists.
pub async fn bootstrap_admin_password(pool: &PgPool, password: &str) -> ServiceResult<bool> {
    if password.trim().is_empty() {
        return Err(ServiceError::validation("bootstrap password must not be blank"));
    }

    let mut tx = pool.begin().await.context("bootstrap_admin_password begin failed")?;
    lock_admin_password(&mut tx).await?;

    if current_value(&mut tx).await?.is_some() {
        return Ok(false);
    }

    sqlx::query("insert into settings (key, value) values ($1, $2)")
        .bind(ADMIN_PASSWORD_KEY)
        .bind(hash_password(password))
        .execute(&mut *tx)
        .await
        .context("bootstrap_admin_password insert failed")?;

    tx.commit().await.context("bootstrap_admin_password commit failed")?;

    info!("admin password bootstrapped");
    Ok(true)
}

/// Every admin password revision, newest first.
pub async fn admin_password_history(pool: &PgPool) -> ServiceResult<Vec<SettingRevision>> {
    let rows = sqlx::query(
        r#"
        select id, changed_at
        from settings
        where key = $1
        order by id desc
        "#,
    )
    .bind(ADMIN_PASSWORD_KEY)
    .fetch_all(pool)
    .await
    .context("admin_password_history failed")?;

    let revisions = rows
        .iter()
        .map(|r| {
            Ok(SettingRevision {
                id: r.try_get("id")?,
                changed_at: r.try_get("changed_at")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;
    Ok(revisions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_and_is_salted() {
        let a = hash_password("123456");
        let b = hash_password("123456");
        assert_ne!(a, b, "fresh salt per hash");
        assert!(a.starts_with("sha256$"));
        assert!(!a.contains("123456"));
        assert!(password_matches(&a, "123456"));
        assert!(password_matches(&b, "123456"));
        assert!(!password_matches(&a, "654321"));
    }

    #[test]
    fn malformed_stored_values_never_match() {
        assert!(!password_matches("123456", "123456"), "plaintext is not accepted");
        assert!(!password_matches("md5$x$y", "y"));
        assert!(!password_matches("sha256$salt", "salt"));
        assert!(!password_matches("", ""));
    }
}
