//! Operator data-repair tasks. Both honour `dry_run`: counts are reported,
//! nothing is written.

use anyhow::{Context, Result};
use mj_checkout::AddressScrubber;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub dry_run: bool,
    pub customers_matched: u64,
    pub customers_updated: u64,
    pub orders_matched: u64,
    pub orders_updated: u64,
    pub carts_emptied: u64,
}

/// Scrub literal "None" fragments from saved customer addresses and order
/// destinations. Carts are not touched.
pub async fn clean_stored_addresses(pool: &PgPool, dry_run: bool) -> Result<MaintenanceReport> {
    let mut report = MaintenanceReport {
        dry_run,
        ..MaintenanceReport::default()
    };

    let customers: Vec<(i64, String)> =
        sqlx::query_as("select id, address from customers where address ilike '%none%'")
            .fetch_all(pool)
            .await
            .context("clean_stored_addresses customer scan failed")?;
    let orders: Vec<(i64, String)> =
        sqlx::query_as("select id, destination from orders where destination ilike '%none%'")
            .fetch_all(pool)
            .await
            .context("clean_stored_addresses order scan failed")?;

    report.customers_matched = customers.len() as u64;
    report.orders_matched = orders.len() as u64;

    let scrubber = AddressScrubber::new().context("address scrubber pattern failed")?;

    let customer_fixes: Vec<(i64, String)> = customers
        .into_iter()
        .filter_map(|(id, old)| {
            scrubber
                .clean_address(&old)
                .filter(|new| *new != old)
                .map(|new| (id, new))
        })
        .collect();
    let order_fixes: Vec<(i64, String)> = orders
        .into_iter()
        .filter_map(|(id, old)| {
            scrubber
                .clean_address(&old)
                .filter(|new| *new != old)
                .map(|new| (id, new))
        })
        .collect();

    if dry_run {
        report.customers_updated = customer_fixes.len() as u64;
        report.orders_updated = order_fixes.len() as u64;
        return Ok(report);
    }

    let mut tx = pool
        .begin()
        .await
        .context("clean_stored_addresses begin failed")?;
    for (id, addr) in &customer_fixes {
        sqlx::query("update customers set address = $2 where id = $1")
            .bind(id)
            .bind(addr)
            .execute(&mut *tx)
            .await
            .context("clean_stored_addresses customer update failed")?;
        report.customers_updated += 1;
    }
    for (id, addr) in &order_fixes {
        sqlx::query("update orders set destination = $2, updated_at_utc = now() where id = $1")
            .bind(id)
            .bind(addr)
            .execute(&mut *tx)
            .await
            .context("clean_stored_addresses order update failed")?;
        report.orders_updated += 1;
    }
    tx.commit()
        .await
        .context("clean_stored_addresses commit failed")?;

    info!(
        customers_updated = report.customers_updated,
        orders_updated = report.orders_updated,
        "stored addresses cleaned"
    );
    Ok(report)
}

/// Empty the carts of customers whose saved address still contains "None".
/// Addresses are not modified.
pub async fn empty_carts_with_bad_addresses(
    pool: &PgPool,
    dry_run: bool,
) -> Result<MaintenanceReport> {
    let (customers_matched, carts): (i64, i64) = sqlx::query_as(
        r#"
        select
          (select count(*) from customers where address ilike '%none%')::bigint,
          (select count(*) from carts ca
             join customers cu on cu.id = ca.customer_id
             where cu.address ilike '%none%')::bigint
        "#,
    )
    .fetch_one(pool)
    .await
    .context("empty_carts_with_bad_addresses scan failed")?;

    let report = MaintenanceReport {
        dry_run,
        customers_matched: customers_matched as u64,
        carts_emptied: carts as u64,
        ..MaintenanceReport::default()
    };
    if dry_run {
        return Ok(report);
    }

    sqlx::query(
        r#"
        delete from cart_items
        where cart_id in (
          select ca.id
          from carts ca
          join customers cu on cu.id = ca.customer_id
          where cu.address ilike '%none%'
        )
        "#,
    )
    .execute(pool)
    .await
    .context("empty_carts_with_bad_addresses delete failed")?;

    info!(carts_emptied = report.carts_emptied, "carts emptied");
    Ok(report)
}
