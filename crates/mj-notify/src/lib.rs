//! mj-notify
//!
//! Order confirmation delivery. Sending is best-effort: the order already
//! exists when a notifier runs, and nothing here can fail or undo it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use mj_catalog::format_cents;
use mj_config::{ResolvedSecrets, ShopConfig};
use mj_db::PlacedOrder;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Relay calls give up after this long.
const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationLine {
    pub name: String,
    pub quantity: i32,
    pub line_total_cents: i64,
}

/// A rendered confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: i64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub tracking_url: String,
    pub lines: Vec<ConfirmationLine>,
    pub total_cents: i64,
}

impl OrderConfirmation {
    pub fn for_order(cfg: &ShopConfig, order: &PlacedOrder) -> Self {
        let tracking_url = cfg.tracking_url(order.order_id, order.tracking_token.as_str());
        let lines: Vec<ConfirmationLine> = order
            .lines
            .iter()
            .map(|l| ConfirmationLine {
                name: l.product_name.clone(),
                quantity: l.quantity,
                line_total_cents: l.line_total_cents(),
            })
            .collect();

        let mut body = format!(
            "Thank you for shopping at {}.\n\nOrder #{}\n\n",
            cfg.shop.name, order.order_id
        );
        for l in &lines {
            body.push_str(&format!(
                "  {} x {}  {} EUR\n",
                l.quantity,
                l.name,
                format_cents(l.line_total_cents)
            ));
        }
        body.push_str(&format!(
            "\nSubtotal: {} EUR\nShipping: {} EUR\nTotal:    {} EUR\n\nDelivery: {}\n\nTrack your order here: {}\n",
            format_cents(order.quote.subtotal_cents),
            format_cents(order.quote.shipping_cents),
            format_cents(order.quote.total_cents),
            order.destination,
            tracking_url
        ));

        Self {
            order_id: order.order_id,
            from: cfg.mail.from.clone(),
            to: order.email.clone(),
            subject: format!("Order confirmation #{}", order.order_id),
            text_body: body,
            tracking_url,
            lines,
            total_cents: order.quote.total_cents,
        }
    }
}

/// Delivery channel for order confirmations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, msg: &OrderConfirmation) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HTTP mail relay
// ---------------------------------------------------------------------------

/// Posts confirmations as JSON to a mail relay endpoint.
///
/// The API key is passed in by the caller; do not log it.
#[derive(Clone)]
pub struct HttpMailRelay {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpMailRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailRelay")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    order_id: i64,
}

impl HttpMailRelay {
    pub fn new(url: String, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .context("mail relay client build failed")?;
        Ok(Self { http, url, api_key })
    }
}

#[async_trait::async_trait]
impl Notifier for HttpMailRelay {
    fn name(&self) -> &'static str {
        "http_mail_relay"
    }

    async fn send(&self, msg: &OrderConfirmation) -> Result<()> {
        let payload = RelayPayload {
            from: &msg.from,
            to: &msg.to,
            subject: &msg.subject,
            text: &msg.text_body,
            order_id: msg.order_id,
        };

        let mut req = self.http.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("mail relay request failed")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!(
                "mail relay http error status={} order_id={}",
                status.as_u16(),
                msg.order_id
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log-only fallback
// ---------------------------------------------------------------------------

/// Used when no relay is configured: the confirmation is only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, msg: &OrderConfirmation) -> Result<()> {
        info!(
            order_id = msg.order_id,
            subject = %msg.subject,
            total_cents = msg.total_cents,
            "order confirmation (log only, no mail relay configured)"
        );
        Ok(())
    }
}

/// Relay when its URL secret resolved, log-only otherwise.
pub fn notifier_from_secrets(secrets: &ResolvedSecrets) -> Result<Arc<dyn Notifier>> {
    match &secrets.mail_relay_url {
        Some(url) => Ok(Arc::new(HttpMailRelay::new(
            url.clone(),
            secrets.mail_relay_key.clone(),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Fire-and-forget send. Failures are logged and swallowed.
pub fn dispatch_best_effort(notifier: Arc<dyn Notifier>, msg: OrderConfirmation) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send(&msg).await {
            Ok(()) => info!(
                order_id = msg.order_id,
                notifier = notifier.name(),
                "order confirmation sent"
            ),
            Err(e) => warn!(
                order_id = msg.order_id,
                notifier = notifier.name(),
                error = %format!("{e:#}"),
                "order confirmation failed; order stands"
            ),
        }
    })
}
