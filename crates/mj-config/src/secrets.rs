//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"MJ_ADMIN_TOKEN"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the result
//!   into constructors; no other module reads these env vars.
//! - `Debug` redacts values; errors name the env var, never the value.
//!
//! # Mode-aware enforcement
//! - `PROD`: admin token is **required**.
//! - `DEV`: everything optional. Without an admin token the admin API stays
//!   closed.
//!
//! The mail relay is optional in every mode; without it confirmations are
//! only logged.

use anyhow::{bail, Result};

use crate::settings::ShopConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    Dev,
    Prod,
}

impl DeployMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEV" => Ok(DeployMode::Dev),
            "PROD" => Ok(DeployMode::Prod),
            other => bail!(
                "SECRETS_UNKNOWN_MODE: unrecognised mode '{}'; expected one of: DEV | PROD",
                other
            ),
        }
    }
}

/// All runtime-resolved secrets. **Values are redacted in `Debug` output.**
#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    pub admin_token: Option<String>,
    pub mail_relay_url: Option<String>,
    pub mail_relay_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<REDACTED>"))
            .field(
                "mail_relay_url",
                &self.mail_relay_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "mail_relay_key",
                &self.mail_relay_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable; unset or blank is `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve every secret named by `cfg` for the configured `shop.mode`.
pub fn resolve_secrets(cfg: &ShopConfig) -> Result<ResolvedSecrets> {
    let mode = DeployMode::parse(&cfg.shop.mode)?;

    let admin_token = resolve_env(&cfg.admin.token_env);
    let mail_relay_url = resolve_env(&cfg.mail.relay_url_env);
    let mail_relay_key = resolve_env(&cfg.mail.relay_key_env);

    if mode == DeployMode::Prod && admin_token.is_none() {
        bail!(
            "SECRETS_MISSING mode=PROD: required env var '{}' (admin token) is not set or empty",
            cfg.admin.token_env
        );
    }

    Ok(ResolvedSecrets {
        admin_token,
        mail_relay_url,
        mail_relay_key,
    })
}
