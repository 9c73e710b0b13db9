use anyhow::{Context, Result};
use mj_checkout::{CartAdjustment, CartLine};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::is_foreign_key_violation;

/// Who a cart belongs to. Identity itself is established upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    Customer(i64),
    Guest(Uuid),
}

impl CartOwner {
    pub fn customer_id(&self) -> Option<i64> {
        match self {
            CartOwner::Customer(id) => Some(*id),
            CartOwner::Guest(_) => None,
        }
    }

    fn session_id(&self) -> Option<Uuid> {
        match self {
            CartOwner::Customer(_) => None,
            CartOwner::Guest(s) => Some(*s),
        }
    }
}

/// Get-or-create the owner's cart id.
///
/// On conflict the existing row is touched, so `returning` yields its id
/// even when a concurrent request created it.
///
/// `None` when the owner is a customer id with no customer row.
pub async fn resolve_cart(pool: &PgPool, owner: CartOwner) -> Result<Option<i64>> {
    let sql = match owner {
        CartOwner::Customer(_) => {
            r#"
            insert into carts (customer_id, session_id)
            values ($1, $2)
            on conflict (customer_id) do update set customer_id = excluded.customer_id
            returning id
            "#
        }
        CartOwner::Guest(_) => {
            r#"
            insert into carts (customer_id, session_id)
            values ($1, $2)
            on conflict (session_id) do update set session_id = excluded.session_id
            returning id
            "#
        }
    };

    let res = sqlx::query_as::<_, (i64,)>(sql)
        .bind(owner.customer_id())
        .bind(owner.session_id())
        .fetch_one(pool)
        .await;

    match res {
        Ok((id,)) => Ok(Some(id)),
        Err(e) if is_foreign_key_violation(&e) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context("resolve_cart failed")),
    }
}

/// Cart lines joined with the current product price and stock.
pub async fn cart_lines(pool: &PgPool, cart_id: i64) -> Result<Vec<CartLine>> {
    let rows = sqlx::query(
        r#"
        select ci.product_id, p.name, ci.quantity, p.price_cents, p.stock
        from cart_items ci
        join products p on p.id = ci.product_id
        where ci.cart_id = $1
        order by ci.id asc
        "#,
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await
    .context("cart_lines failed")?;

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

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AddOutcome {
    Added { line_quantity: i32, total_items: i64 },
    InvalidQuantity,
    ProductNotFound,
    UnknownCustomer,
    /// The requested quantity alone exceeds stock.
    InsufficientStock { available: i32 },
    /// What is already in the cart plus the request exceeds stock.
    LimitReached { in_cart: i32, available: i32 },
}

/// Add `quantity` units of a product to the owner's cart.
///
/// Only checks availability; stock is decremented at placement.
pub async fn add_to_cart(
    pool: &PgPool,
    owner: CartOwner,
    product_id: i64,
    quantity: i32,
) -> Result<AddOutcome> {
    if quantity < 1 {
        return Ok(AddOutcome::InvalidQuantity);
    }
    let cart_id = match resolve_cart(pool, owner).await? {
        Some(id) => id,
        None => return Ok(AddOutcome::UnknownCustomer),
    };

    let mut tx = pool.begin().await.context("add_to_cart begin failed")?;

    let stock: Option<(i32,)> =
        sqlx::query_as("select stock from products where id = $1 for share")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .context("add_to_cart product lookup failed")?;
    let Some((available,)) = stock else {
        return Ok(AddOutcome::ProductNotFound);
    };

    if quantity > available {
        return Ok(AddOutcome::InsufficientStock { available });
    }

    let existing: Option<(i32,)> = sqlx::query_as(
        "select quantity from cart_items where cart_id = $1 and product_id = $2 for update",
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await
    .context("add_to_cart line lookup failed")?;
    let in_cart = existing.map(|(q,)| q).unwrap_or(0);

    let over_limit = match in_cart.checked_add(quantity) {
        Some(wanted) => wanted > available,
        None => true,
    };
    if over_limit {
        return Ok(AddOutcome::LimitReached { in_cart, available });
    }

    let (line_quantity,): (i32,) = sqlx::query_as(
        r#"
        insert into cart_items (cart_id, product_id, quantity)
        values ($1, $2, $3)
        on conflict (cart_id, product_id)
        do update set quantity = cart_items.quantity + excluded.quantity
        returning quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await
    .context("add_to_cart upsert failed")?;

    let total_items = count_items(&mut *tx, cart_id).await?;

    tx.commit().await.context("add_to_cart commit failed")?;

    Ok(AddOutcome::Added {
        line_quantity,
        total_items,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DecrementOutcome {
    Decremented { quantity: i32 },
    Removed,
    NotInCart,
}

/// The cart's "-" button: one unit less, the line goes away at zero.
pub async fn decrement_cart_item(
    pool: &PgPool,
    cart_id: i64,
    product_id: i64,
) -> Result<DecrementOutcome> {
    let dec: Option<(i32,)> = sqlx::query_as(
        r#"
        update cart_items
        set quantity = quantity - 1
        where cart_id = $1 and product_id = $2 and quantity > 1
        returning quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .context("decrement_cart_item update failed")?;

    if let Some((quantity,)) = dec {
        return Ok(DecrementOutcome::Decremented { quantity });
    }

    if remove_cart_item(pool, cart_id, product_id).await? {
        Ok(DecrementOutcome::Removed)
    } else {
        Ok(DecrementOutcome::NotInCart)
    }
}

/// Drop one line entirely. False when the product was not in the cart.
pub async fn remove_cart_item(pool: &PgPool, cart_id: i64, product_id: i64) -> Result<bool> {
    let res = sqlx::query("delete from cart_items where cart_id = $1 and product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(pool)
        .await
        .context("remove_cart_item failed")?;
    Ok(res.rows_affected() > 0)
}

/// Empty the cart. Returns the number of lines removed.
pub async fn clear_cart(pool: &PgPool, cart_id: i64) -> Result<u64> {
    let res = sqlx::query("delete from cart_items where cart_id = $1")
        .bind(cart_id)
        .execute(pool)
        .await
        .context("clear_cart failed")?;
    Ok(res.rows_affected())
}

/// Total units in the cart (header badge).
pub async fn cart_item_count(pool: &PgPool, cart_id: i64) -> Result<i64> {
    let mut conn = pool.acquire().await.context("cart_item_count acquire failed")?;
    count_items(&mut *conn, cart_id).await
}

async fn count_items(conn: &mut PgConnection, cart_id: i64) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        "select coalesce(sum(quantity), 0)::bigint from cart_items where cart_id = $1",
    )
    .bind(cart_id)
    .fetch_one(conn)
    .await
    .context("cart item count failed")?;
    Ok(n)
}

/// Persist gatekeeper adjustments: removed lines are deleted, clamped lines
/// get their new quantity.
pub async fn apply_adjustments(
    conn: &mut PgConnection,
    cart_id: i64,
    adjustments: &[CartAdjustment],
) -> Result<()> {
    for adj in adjustments {
        match adj {
            CartAdjustment::Removed { product_id, .. } => {
                sqlx::query("delete from cart_items where cart_id = $1 and product_id = $2")
                    .bind(cart_id)
                    .bind(product_id)
                    .execute(&mut *conn)
                    .await
                    .context("apply_adjustments delete failed")?;
            }
            CartAdjustment::Clamped { product_id, to, .. } => {
                sqlx::query(
                    "update cart_items set quantity = $3 where cart_id = $1 and product_id = $2",
                )
                .bind(cart_id)
                .bind(product_id)
                .bind(to)
                .execute(&mut *conn)
                .await
                .context("apply_adjustments clamp failed")?;
            }
        }
    }
    Ok(())
}
