//! brew-daemon entry point.
//!
//! Sets up tracing, loads config and secrets, connects and migrates the
//! database, then serves the router. Handlers live in `routes.rs`; shared
//! state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use brew_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (cfg, loaded) = brew_config::load_from_env().context("config load failed")?;
    info!(config_hash = %loaded.config_hash, "config loaded");
    let secrets = brew_config::resolve_secrets(&cfg)?;

    let pool = brew_db::connect(
        &secrets.database_url,
        cfg.database.max_connections,
        Duration::from_millis(cfg.database.acquire_timeout_ms),
    )
    .await?;
    if cfg.database.migrate_on_boot {
        brew_db::migrate(&pool).await?;
        info!("migrations applied");
    }

    match &secrets.admin_bootstrap_password {
        Some(pw) => {
            if brew_db::bootstrap_admin_password(&pool, pw).await? {
                info!("admin password initialised from bootstrap env var");
            }
        }
        None => {
            if brew_db::admin_password_history(&pool).await?.is_empty() {
                warn!(
                    env = %cfg.admin.bootstrap_password_env,
                    "no admin password configured; admin endpoints will fail until one is set"
                );
            }
        }
    }

    let shared = Arc::new(state::AppState::new(pool, &cfg));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(15));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_config(&cfg.server.cors_origins));

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg
            .server
            .bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server.bind_addr: {}", cfg.server.bind_addr))?,
    };
    info!("brew-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `BREW_DAEMON_ADDR` overrides `server.bind_addr`.
fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("BREW_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: only the configured browser origins.
fn cors_from_config(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
