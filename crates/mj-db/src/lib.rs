//! mj-db
//!
//! Postgres persistence for the garden shop (sqlx, runtime queries).
//! The checkout transaction lives in [`checkout::place_order`].

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod cart;
mod catalog;
mod checkout;
mod customers;
mod maintenance;
mod orders;
mod sales;

pub use cart::{
    add_to_cart, apply_adjustments, cart_item_count, cart_lines, clear_cart, decrement_cart_item,
    remove_cart_item, resolve_cart, AddOutcome, CartOwner, DecrementOutcome,
};
pub use catalog::{
    delete_product, featured_products, fetch_product, filter_options, insert_product,
    list_products, products_by_category, related_products, reorder_products, stock_levels,
    update_product, CategoryListing, DeleteOutcome,
};
pub use checkout::{place_order, prepare_checkout, CheckoutPreview, PlaceOrderOutcome, PlacedOrder};
pub use customers::{
    delete_customer, fetch_customer, insert_customer, list_customers, update_customer_profile,
    CreateCustomerOutcome, Customer, NewCustomer, ProfileUpdate,
};
pub use maintenance::{clean_stored_addresses, empty_carts_with_bad_addresses, MaintenanceReport};
pub use orders::{
    fetch_order, fetch_order_for_tracking, list_orders, order_history, order_lines,
    set_order_status, OrderLineRow, OrderRow, StatusChange, StatusHistoryRow,
};
pub use sales::{sales_report, SalesFilter, SalesReport, SalesRow};

pub const ENV_DB_URL: &str = "MJ_DATABASE_URL";

/// Connect to Postgres using MJ_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Orders not yet delivered. The CLI refuses to migrate while any exist
/// unless the operator confirms.
pub async fn count_open_orders(pool: &PgPool) -> Result<i64> {
    // No schema yet: nothing open.
    let st = status(pool).await?;
    if !st.has_orders_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)::bigint
        from orders
        where status <> 'DELIVERED'
        "#,
    )
    .fetch_one(pool)
    .await
    .context("count_open_orders failed")?;

    Ok(n)
}

/// Detect a Postgres unique constraint violation by name.
pub(crate) fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Postgres foreign_key_violation (23503).
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}

/// `%term%` for ILIKE with the pattern metacharacters escaped.
pub(crate) fn ilike_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
