//! Confirmation rendering and relay delivery against a mock HTTP server.

use std::sync::Arc;

use httpmock::prelude::*;
use mj_checkout::{
    CartLine, OrderStatus, PaymentMethod, Quote, ShippingOption, TrackingToken,
};
use mj_config::{ResolvedSecrets, ShopConfig};
use mj_db::PlacedOrder;
use mj_notify::{
    dispatch_best_effort, notifier_from_secrets, HttpMailRelay, Notifier, OrderConfirmation,
};

fn placed_order() -> PlacedOrder {
    PlacedOrder {
        order_id: 42,
        cart_id: 7,
        tracking_token: TrackingToken::parse("0123456789abcdef0123456789abcdef").unwrap(),
        status: OrderStatus::Placed,
        shipping: ShippingOption::HomeDelivery,
        payment: PaymentMethod::Gateway,
        paid: true,
        email: "cliente@example.com".to_string(),
        destination: "Calle Betis 10, 41010 Sevilla, España".to_string(),
        lines: vec![CartLine {
            product_id: 1,
            product_name: "Tijeras de podar".to_string(),
            quantity: 2,
            unit_price_cents: 1_995,
            stock: 10,
        }],
        quote: Quote {
            subtotal_cents: 3_990,
            shipping_cents: 500,
            total_cents: 4_490,
        },
        placed_at_utc: chrono::Utc::now(),
    }
}

#[test]
fn confirmation_carries_tracking_link_and_totals() {
    let mut cfg = ShopConfig::default();
    cfg.shop.public_base_url = "https://tienda.example".to_string();

    let msg = OrderConfirmation::for_order(&cfg, &placed_order());
    assert_eq!(msg.subject, "Order confirmation #42");
    assert_eq!(msg.to, "cliente@example.com");
    assert_eq!(msg.from, cfg.mail.from);
    assert_eq!(
        msg.tracking_url,
        "https://tienda.example/tracking/42/0123456789abcdef0123456789abcdef"
    );
    assert_eq!(msg.lines.len(), 1);
    assert_eq!(msg.lines[0].line_total_cents, 3_990);
    assert!(msg.text_body.contains("2 x Tijeras de podar  39.90 EUR"));
    assert!(msg.text_body.contains("Total:    44.90 EUR"));
    assert!(msg.text_body.contains(&msg.tracking_url));
}

#[tokio::test]
async fn relay_posts_json_with_bearer_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/send")
                .header("authorization", "Bearer relay-key")
                .body_contains("\"to\":\"cliente@example.com\"")
                .body_contains("\"subject\":\"Order confirmation #42\"");
            then.status(202);
        })
        .await;

    let relay =
        HttpMailRelay::new(server.url("/send"), Some("relay-key".to_string())).unwrap();
    let msg = OrderConfirmation::for_order(&ShopConfig::default(), &placed_order());

    relay.send(&msg).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn relay_error_status_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/send");
            then.status(503);
        })
        .await;

    let relay = HttpMailRelay::new(server.url("/send"), None).unwrap();
    let msg = OrderConfirmation::for_order(&ShopConfig::default(), &placed_order());

    let err = relay.send(&msg).await.unwrap_err();
    assert!(format!("{err}").contains("status=503"));
}

#[tokio::test]
async fn best_effort_dispatch_swallows_failures() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/send");
            then.status(500);
        })
        .await;

    let relay: Arc<dyn Notifier> = Arc::new(HttpMailRelay::new(server.url("/send"), None).unwrap());
    let msg = OrderConfirmation::for_order(&ShopConfig::default(), &placed_order());

    // The task completes normally even though delivery failed.
    dispatch_best_effort(relay, msg).await.unwrap();
    mock.assert_async().await;
}

#[test]
fn without_relay_url_confirmations_are_logged() {
    let n = notifier_from_secrets(&ResolvedSecrets::default()).unwrap();
    assert_eq!(n.name(), "log");

    let with_relay = ResolvedSecrets {
        mail_relay_url: Some("http://127.0.0.1:9/send".to_string()),
        ..ResolvedSecrets::default()
    };
    assert_eq!(notifier_from_secrets(&with_relay).unwrap().name(), "http_mail_relay");
}
