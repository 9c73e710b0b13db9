//! Shared runtime state for mj-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The database pool is
//! optional: without one, every data route answers 503 while health and the
//! admin gate keep working.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mj_checkout::OrderStatus;
use mj_config::{ResolvedSecrets, ShopConfig};
use mj_notify::Notifier;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusMsg: admin SSE payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced on
/// `/v1/admin/stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    OrderPlaced {
        order_id: i64,
        total_cents: i64,
        guest: bool,
    },
    OrderStatus {
        order_id: i64,
        status: OrderStatus,
        paid: bool,
    },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config: Arc<ShopConfig>,
    /// `None` closes the admin surface.
    pub admin_token: Option<String>,
    pub db: Option<PgPool>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Notifier is picked from the resolved secrets (relay or log-only).
    pub fn new(config: ShopConfig, secrets: &ResolvedSecrets, db: Option<PgPool>) -> Result<Self> {
        let notifier = mj_notify::notifier_from_secrets(secrets)?;
        Ok(Self::with_notifier(config, secrets, db, notifier))
    }

    pub fn with_notifier(
        config: ShopConfig,
        secrets: &ResolvedSecrets,
        db: Option<PgPool>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "mj-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: Arc::new(config),
            admin_token: secrets.admin_token.clone(),
            db,
            notifier,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
