//! Typed view over the merged config JSON.
//!
//! Every key is optional; [`ShopConfig::default`] is a runnable dev setup.

use anyhow::{bail, Context, Result};
use mj_checkout::ShippingPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub shop: ShopSection,
    pub shipping: ShippingSettings,
    pub mail: MailSettings,
    pub admin: AdminSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSection {
    pub name: String,
    /// "DEV" | "PROD"
    pub mode: String,
    /// Absolute base used to build tracking links in notifications.
    pub public_base_url: String,
}

impl Default for ShopSection {
    fn default() -> Self {
        Self {
            name: "Mundo Jardín".to_string(),
            mode: "DEV".to_string(),
            public_base_url: "http://localhost:8899".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingSettings {
    pub free_threshold_cents: i64,
    pub flat_fee_cents: i64,
    pub pickup_address: String,
}

impl Default for ShippingSettings {
    fn default() -> Self {
        let p = ShippingPolicy::default();
        Self {
            free_threshold_cents: p.free_threshold_cents,
            flat_fee_cents: p.flat_fee_cents,
            pickup_address: p.pickup_address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub from: String,
    /// NAME of the env var holding the mail relay endpoint URL.
    pub relay_url_env: String,
    /// NAME of the env var holding the mail relay API key.
    pub relay_key_env: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from: "pedidos@mundojardin.example".to_string(),
            relay_url_env: "MJ_MAIL_RELAY_URL".to_string(),
            relay_key_env: "MJ_MAIL_RELAY_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// NAME of the env var holding the admin bearer token.
    pub token_env: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            token_env: "MJ_ADMIN_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub featured_limit: i64,
    pub related_limit: i64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            featured_limit: 5,
            related_limit: 5,
        }
    }
}

impl ShopConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: ShopConfig =
            serde_json::from_value(config_json.clone()).context("invalid shop config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shipping.free_threshold_cents < 0 || self.shipping.flat_fee_cents < 0 {
            bail!("CONFIG_INVALID: shipping amounts must be >= 0");
        }
        if self.shipping.pickup_address.trim().is_empty() {
            bail!("CONFIG_INVALID: shipping.pickup_address must not be empty");
        }
        if self.catalog.featured_limit <= 0 || self.catalog.related_limit <= 0 {
            bail!("CONFIG_INVALID: catalog limits must be > 0");
        }
        Ok(())
    }

    pub fn shipping_policy(&self) -> ShippingPolicy {
        ShippingPolicy {
            free_threshold_cents: self.shipping.free_threshold_cents,
            flat_fee_cents: self.shipping.flat_fee_cents,
            pickup_address: self.shipping.pickup_address.clone(),
        }
    }

    /// Absolute guest tracking link for an order.
    pub fn tracking_url(&self, order_id: i64, token: &str) -> String {
        format!(
            "{}/tracking/{}/{}",
            self.shop.public_base_url.trim_end_matches('/'),
            order_id,
            token
        )
    }
}
