use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use mj_checkout::{
    OrderStatus, PaymentMethod, ShippingOption, TrackingToken, Transition, TransitionError,
};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const ORDER_COLUMNS: &str = r#"
    id, customer_id, tracking_token, status, shipping, payment, paid,
    email, phone, destination, subtotal_cents, shipping_cents, total_cents,
    placed_at_utc, updated_at_utc
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRow {
    pub id: i64,
    /// `None` for guest orders and for orders of deleted customers.
    pub customer_id: Option<i64>,
    #[serde(skip_serializing)]
    pub tracking_token: TrackingToken,
    pub status: OrderStatus,
    pub shipping: ShippingOption,
    pub payment: PaymentMethod,
    pub paid: bool,
    pub email: String,
    pub phone: String,
    pub destination: String,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub placed_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineRow {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusHistoryRow {
    /// `None` on the placement entry.
    pub previous_status: Option<OrderStatus>,
    pub status: OrderStatus,
    pub notes: String,
    pub actor: String,
    pub changed_at_utc: DateTime<Utc>,
}

pub(crate) fn order_from_row(row: &PgRow) -> Result<OrderRow> {
    let shipping: String = row.try_get("shipping")?;
    let payment: String = row.try_get("payment")?;
    Ok(OrderRow {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        tracking_token: TrackingToken::parse(&row.try_get::<String, _>("tracking_token")?)?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
        shipping: ShippingOption::parse(&shipping)
            .ok_or_else(|| anyhow!("invalid shipping option: {}", shipping))?,
        payment: PaymentMethod::parse(&payment)
            .ok_or_else(|| anyhow!("invalid payment method: {}", payment))?,
        paid: row.try_get("paid")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        destination: row.try_get("destination")?,
        subtotal_cents: row.try_get("subtotal_cents")?,
        shipping_cents: row.try_get("shipping_cents")?,
        total_cents: row.try_get("total_cents")?,
        placed_at_utc: row.try_get("placed_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

pub async fn fetch_order(pool: &PgPool, order_id: i64) -> Result<Option<OrderRow>> {
    let sql = format!("select {ORDER_COLUMNS} from orders where id = $1");
    let row = sqlx::query(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?;

    row.as_ref().map(order_from_row).transpose()
}

/// Guest lookup. A wrong token and an unknown id look the same.
pub async fn fetch_order_for_tracking(
    pool: &PgPool,
    order_id: i64,
    presented_token: &str,
) -> Result<Option<OrderRow>> {
    Ok(fetch_order(pool, order_id)
        .await?
        .filter(|o| o.tracking_token.matches(presented_token)))
}

pub async fn order_lines(pool: &PgPool, order_id: i64) -> Result<Vec<OrderLineRow>> {
    let rows = sqlx::query(
        r#"
        select product_id, product_name, quantity, unit_price_cents
        from order_items
        where order_id = $1
        order by id asc
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("order_lines failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let quantity: i32 = row.try_get("quantity")?;
        let unit_price_cents: i64 = row.try_get("unit_price_cents")?;
        out.push(OrderLineRow {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            quantity,
            unit_price_cents,
            line_total_cents: unit_price_cents * i64::from(quantity),
        });
    }
    Ok(out)
}

/// Orders oldest first, optionally narrowed by status and/or customer.
pub async fn list_orders(
    pool: &PgPool,
    status: Option<OrderStatus>,
    customer_id: Option<i64>,
) -> Result<Vec<OrderRow>> {
    let sql = format!(
        r#"
        select {ORDER_COLUMNS}
        from orders
        where ($1::text is null or status = $1)
          and ($2::bigint is null or customer_id = $2)
        order by placed_at_utc asc, id asc
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(status.map(|s| s.as_str()))
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .context("list_orders failed")?;

    rows.iter().map(order_from_row).collect()
}

pub async fn order_history(pool: &PgPool, order_id: i64) -> Result<Vec<StatusHistoryRow>> {
    let rows = sqlx::query(
        r#"
        select previous_status, status, notes, actor, changed_at_utc
        from order_status_history
        where order_id = $1
        order by id asc
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("order_history failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let previous: Option<String> = row.try_get("previous_status")?;
        out.push(StatusHistoryRow {
            previous_status: previous.as_deref().map(OrderStatus::parse).transpose()?,
            status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
            notes: row.try_get("notes")?,
            actor: row.try_get("actor")?,
            changed_at_utc: row.try_get("changed_at_utc")?,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Applied {
        transition: Transition,
        order: OrderRow,
    },
    /// Requested status equals the current one; nothing written.
    Unchanged(OrderRow),
    Refused(TransitionError),
    NotFound,
}

/// Admin status update. Moving to DELIVERED also marks the order paid.
pub async fn set_order_status(
    pool: &PgPool,
    order_id: i64,
    next: OrderStatus,
    actor: &str,
    notes: &str,
) -> Result<StatusChange> {
    let mut tx = pool.begin().await.context("set_order_status begin failed")?;

    let current: Option<(String,)> =
        sqlx::query_as("select status from orders where id = $1 for update")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await
            .context("set_order_status lock failed")?;
    let Some((current,)) = current else {
        return Ok(StatusChange::NotFound);
    };
    let current = OrderStatus::parse(&current)?;

    let transition = match current.transition(next) {
        Ok(t) => t,
        Err(e) => return Ok(StatusChange::Refused(e)),
    };

    if !transition.changed {
        drop(tx);
        let order = fetch_order(pool, order_id)
            .await?
            .ok_or_else(|| anyhow!("order {} vanished", order_id))?;
        return Ok(StatusChange::Unchanged(order));
    }

    let sql = format!(
        r#"
        update orders
        set status = $2,
            paid = paid or $3,
            updated_at_utc = now()
        where id = $1
        returning {ORDER_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(order_id)
        .bind(transition.to.as_str())
        .bind(transition.marks_paid)
        .fetch_one(&mut *tx)
        .await
        .context("set_order_status update failed")?;
    let order = order_from_row(&row)?;

    sqlx::query(
        r#"
        insert into order_status_history (order_id, previous_status, status, notes, actor)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(order_id)
    .bind(transition.from.as_str())
    .bind(transition.to.as_str())
    .bind(notes.trim())
    .bind(actor)
    .execute(&mut *tx)
    .await
    .context("set_order_status history failed")?;

    tx.commit().await.context("set_order_status commit failed")?;

    tracing::info!(
        order_id,
        from = transition.from.as_str(),
        to = transition.to.as_str(),
        marks_paid = transition.marks_paid,
        "order status changed"
    );

    Ok(StatusChange::Applied { transition, order })
}
