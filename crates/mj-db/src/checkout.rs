//! Cart -> order placement.
//!
//! `place_order` is the one write path that touches stock. Everything it
//! does (order header, order lines, stock decrements, cart cleanup, first
//! status history row, saved address) commits or rolls back together.
//!
//! Lock order inside the transaction: cart row first, then product rows in
//! ascending id order. Concurrent checkouts over overlapping products queue
//! on the product locks instead of deadlocking.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use mj_checkout::{
    initial_paid, quote, reconcile, resolve_destination, verify_stock, AddressParts,
    CartAdjustment, CartLine, CheckoutError, CheckoutRequest, OrderStatus, PaymentMethod, Quote,
    ShippingOption, ShippingPolicy, TrackingToken,
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{info, warn};

use crate::cart::{apply_adjustments, cart_lines, resolve_cart, CartOwner};
use crate::customers::fetch_customer;

/// What the checkout page shows before the customer commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckoutPreview {
    Empty,
    UnknownCustomer,
    /// The gatekeeper changed the cart; the customer must review it first.
    Adjusted { adjustments: Vec<CartAdjustment> },
    Ready {
        lines: Vec<CartLine>,
        quote: Quote,
        /// Prefill from the customer's saved address.
        saved_address: Option<AddressParts>,
    },
}

/// Gatekeeper for the checkout page: reconciles the stored cart against
/// current stock (persisting any adjustment) and quotes it.
pub async fn prepare_checkout(
    pool: &PgPool,
    owner: CartOwner,
    shipping: ShippingOption,
    policy: &ShippingPolicy,
) -> Result<CheckoutPreview> {
    let Some(cart_id) = resolve_cart(pool, owner).await? else {
        return Ok(CheckoutPreview::UnknownCustomer);
    };

    let lines = cart_lines(pool, cart_id).await?;
    if lines.is_empty() {
        return Ok(CheckoutPreview::Empty);
    }

    let rec = reconcile(&lines);
    if !rec.is_clean() {
        let mut conn = pool.acquire().await.context("prepare_checkout acquire failed")?;
        apply_adjustments(&mut conn, cart_id, &rec.adjustments).await?;
        info!(
            cart_id,
            adjustments = rec.adjustments.len(),
            "checkout gatekeeper adjusted cart"
        );
        return Ok(CheckoutPreview::Adjusted {
            adjustments: rec.adjustments,
        });
    }

    let saved_address = match owner.customer_id() {
        Some(id) => fetch_customer(pool, id)
            .await?
            .filter(|c| !c.address.trim().is_empty())
            .map(|c| AddressParts::from_stored(&c.address)),
        None => None,
    };

    Ok(CheckoutPreview::Ready {
        quote: quote(&rec.keep, shipping, policy),
        lines: rec.keep,
        saved_address,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub cart_id: i64,
    pub tracking_token: TrackingToken,
    pub status: OrderStatus,
    pub shipping: ShippingOption,
    pub payment: PaymentMethod,
    pub paid: bool,
    pub email: String,
    pub destination: String,
    pub lines: Vec<CartLine>,
    pub quote: Quote,
    pub placed_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderOutcome {
    Placed(PlacedOrder),
    EmptyCart,
    UnknownCustomer,
    /// Stock moved since the cart was filled. Adjustments were saved to the
    /// cart; no order was created and no stock changed.
    CartAdjusted { adjustments: Vec<CartAdjustment> },
    /// The checkout form itself is invalid.
    Rejected(CheckoutError),
}

/// Place an order from the owner's cart in a single transaction.
pub async fn place_order(
    pool: &PgPool,
    owner: CartOwner,
    req: &CheckoutRequest,
    policy: &ShippingPolicy,
) -> Result<PlaceOrderOutcome> {
    if let Err(e) = req.validate() {
        return Ok(PlaceOrderOutcome::Rejected(e));
    }
    let destination = match resolve_destination(req.shipping, &req.address, policy) {
        Ok(d) => d,
        Err(e) => return Ok(PlaceOrderOutcome::Rejected(e)),
    };

    let Some(cart_id) = resolve_cart(pool, owner).await? else {
        return Ok(PlaceOrderOutcome::UnknownCustomer);
    };

    let mut tx = pool.begin().await.context("place_order begin failed")?;

    // Serializes concurrent submits of the same cart.
    sqlx::query("select id from carts where id = $1 for update")
        .bind(cart_id)
        .execute(&mut *tx)
        .await
        .context("place_order cart lock failed")?;

    let lines = locked_cart_lines(&mut tx, cart_id).await?;
    if lines.is_empty() {
        return Ok(PlaceOrderOutcome::EmptyCart);
    }

    let rec = reconcile(&lines);
    if !rec.is_clean() {
        apply_adjustments(&mut tx, cart_id, &rec.adjustments).await?;
        tx.commit()
            .await
            .context("place_order adjustment commit failed")?;
        warn!(
            cart_id,
            adjustments = rec.adjustments.len(),
            "checkout aborted: cart adjusted to current stock"
        );
        return Ok(PlaceOrderOutcome::CartAdjusted {
            adjustments: rec.adjustments,
        });
    }
    verify_stock(&lines).context("stock verification under lock failed")?;

    let q = quote(&lines, req.shipping, policy);
    let paid = initial_paid(req.payment);
    let token = TrackingToken::generate();
    let email = req.email.trim().to_string();

    let header = sqlx::query(
        r#"
        insert into orders (
          customer_id, tracking_token, status, shipping, payment, paid,
          email, phone, destination, subtotal_cents, shipping_cents, total_cents
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
        )
        returning id, placed_at_utc
        "#,
    )
    .bind(owner.customer_id())
    .bind(token.as_str())
    .bind(OrderStatus::Placed.as_str())
    .bind(req.shipping.as_str())
    .bind(req.payment.as_str())
    .bind(paid)
    .bind(&email)
    .bind(req.phone.trim())
    .bind(&destination)
    .bind(q.subtotal_cents)
    .bind(q.shipping_cents)
    .bind(q.total_cents)
    .fetch_one(&mut *tx)
    .await
    .context("place_order insert order failed")?;
    let order_id: i64 = header.try_get("id")?;
    let placed_at_utc: DateTime<Utc> = header.try_get("placed_at_utc")?;

    for line in &lines {
        sqlx::query(
            r#"
            insert into order_items (order_id, product_id, product_name, quantity, unit_price_cents)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .execute(&mut *tx)
        .await
        .context("place_order insert order line failed")?;

        let res = sqlx::query(
            r#"
            update products
            set stock = stock - $2,
                sold_out = sold_out or stock - $2 = 0,
                updated_at_utc = now()
            where id = $1 and stock >= $2
            "#,
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await
        .context("place_order stock decrement failed")?;
        if res.rows_affected() != 1 {
            bail!(
                "stock guard refused decrement: product_id={} quantity={}",
                line.product_id,
                line.quantity
            );
        }
    }

    sqlx::query("delete from cart_items where cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await
        .context("place_order clear cart failed")?;

    let actor = match owner {
        CartOwner::Customer(id) => format!("customer:{id}"),
        CartOwner::Guest(_) => "guest".to_string(),
    };
    sqlx::query(
        r#"
        insert into order_status_history (order_id, status, notes, actor)
        values ($1, $2, 'order placed', $3)
        "#,
    )
    .bind(order_id)
    .bind(OrderStatus::Placed.as_str())
    .bind(&actor)
    .execute(&mut *tx)
    .await
    .context("place_order insert history failed")?;

    if let (Some(customer_id), ShippingOption::HomeDelivery) = (owner.customer_id(), req.shipping)
    {
        sqlx::query("update customers set address = $2 where id = $1")
            .bind(customer_id)
            .bind(&destination)
            .execute(&mut *tx)
            .await
            .context("place_order save address failed")?;
    }

    tx.commit().await.context("place_order commit failed")?;

    info!(
        order_id,
        cart_id,
        total_cents = q.total_cents,
        lines = lines.len(),
        "order placed"
    );

    Ok(PlaceOrderOutcome::Placed(PlacedOrder {
        order_id,
        cart_id,
        tracking_token: token,
        status: OrderStatus::Placed,
        shipping: req.shipping,
        payment: req.payment,
        paid,
        email,
        destination,
        lines,
        quote: q,
        placed_at_utc,
    }))
}

/// Cart lines with their product rows locked, in product id order.
async fn locked_cart_lines(conn: &mut PgConnection, cart_id: i64) -> Result<Vec<CartLine>> {
    let rows = sqlx::query(
        r#"
        select ci.product_id, p.name, ci.quantity, p.price_cents, p.stock
        from cart_items ci
        join products p on p.id = ci.product_id
        where ci.cart_id = $1
        order by p.id asc
        for update of p
        "#,
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await
    .context("locked_cart_lines failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(CartLine {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit_price_cents: row.try_get("price_cents")?,
            stock: row.try_get("stock")?,
        });
    }
    Ok(out)
}
