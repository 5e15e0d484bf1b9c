//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `database.url_env:
//!   "BREW_DATABASE_URL"`).
//! - Binaries call [`resolve_secrets`] once at startup and pass the result to
//!   constructors; `std::env::var` is not scattered across the codebase.
//! - `Debug` output **redacts** values.
//! - Error messages reference the env var **NAME**, never the value.

use anyhow::{bail, Result};

use crate::AppConfig;

/// All runtime-resolved secrets. **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Postgres connection URL. Always present once resolved.
    pub database_url: String,
    /// First admin password, used only when the password history is empty.
    pub admin_bootstrap_password: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .field(
                "admin_bootstrap_password",
                &self.admin_bootstrap_password.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable.
/// Returns `None` if the variable is unset or its value is blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve every secret named by `cfg`.
///
/// # Errors
/// Returns `Err` with the **env var NAME** of the missing database URL.
pub fn resolve_secrets(cfg: &AppConfig) -> Result<ResolvedSecrets> {
    let url_var = cfg.database.url_env.trim();
    let Some(database_url) = resolve_env(url_var) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            url_var
        );
    };

    Ok(ResolvedSecrets {
        database_url,
        admin_bootstrap_password: resolve_env(cfg.admin.bootstrap_password_env.trim()),
    })
}
