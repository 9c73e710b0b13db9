//! mj-daemon entry point.
//!
//! Thin: loads config and secrets, connects the pool, wires middleware and
//! starts the HTTP server. Handlers live in `routes.rs` / `admin.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mj_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = mj_config::load_from_env().context("config load failed")?;
    mj_config::report_unused_keys(&loaded.config_json, mj_config::UnusedKeyPolicy::Warn)?;
    let cfg = loaded.shop()?;
    cfg.validate()?;
    let secrets = mj_config::resolve_secrets(&cfg)?;
    info!(config_hash = %loaded.config_hash, mode = %cfg.shop.mode, "config loaded");

    if secrets.admin_token.is_none() {
        warn!("no admin token configured; admin API is closed");
    }

    // Without a database the daemon still boots; data routes answer 503.
    let db = match mj_db::connect_from_env().await {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "database unavailable; serving 503 on data routes");
            None
        }
    };

    let shared = Arc::new(state::AppState::new(cfg, &secrets, db)?);
    info!(notifier = shared.notifier.name(), "confirmation notifier ready");

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(15));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    info!("mj-daemon listening on http://{}", addr);

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

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("MJ_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

/// CORS: the storefront dev servers on localhost only.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
