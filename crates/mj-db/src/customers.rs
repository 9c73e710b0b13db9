use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::is_unique_constraint_violation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// One-line saved shipping address (may be empty).
    pub address: String,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Partial profile edit; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateCustomerOutcome {
    Created(Customer),
    EmailTaken,
}

fn customer_from_row(row: &PgRow) -> Result<Customer> {
    Ok(Customer {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

pub async fn insert_customer(pool: &PgPool, c: &NewCustomer) -> Result<CreateCustomerOutcome> {
    let res = sqlx::query(
        r#"
        insert into customers (full_name, email, phone, address)
        values ($1, $2, $3, $4)
        returning id, full_name, email, phone, address, created_at_utc
        "#,
    )
    .bind(c.full_name.trim())
    .bind(c.email.trim().to_lowercase())
    .bind(c.phone.trim())
    .bind(c.address.trim())
    .fetch_one(pool)
    .await;

    match res {
        Ok(row) => Ok(CreateCustomerOutcome::Created(customer_from_row(&row)?)),
        Err(e) if is_unique_constraint_violation(&e, "uq_customers_email") => {
            Ok(CreateCustomerOutcome::EmailTaken)
        }
        Err(e) => Err(anyhow::Error::new(e).context("insert_customer failed")),
    }
}

pub async fn fetch_customer(pool: &PgPool, customer_id: i64) -> Result<Option<Customer>> {
    let row = sqlx::query(
        r#"
        select id, full_name, email, phone, address, created_at_utc
        from customers
        where id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await
    .context("fetch_customer failed")?;

    row.as_ref().map(customer_from_row).transpose()
}

pub async fn update_customer_profile(
    pool: &PgPool,
    customer_id: i64,
    upd: &ProfileUpdate,
) -> Result<Option<Customer>> {
    let row = sqlx::query(
        r#"
        update customers
        set full_name = coalesce($2, full_name),
            phone = coalesce($3, phone),
            address = coalesce($4, address)
        where id = $1
        returning id, full_name, email, phone, address, created_at_utc
        "#,
    )
    .bind(customer_id)
    .bind(upd.full_name.as_deref().map(str::trim))
    .bind(upd.phone.as_deref().map(str::trim))
    .bind(upd.address.as_deref().map(str::trim))
    .fetch_optional(pool)
    .await
    .context("update_customer_profile failed")?;

    row.as_ref().map(customer_from_row).transpose()
}

/// All customers, by name.
pub async fn list_customers(pool: &PgPool) -> Result<Vec<Customer>> {
    let rows = sqlx::query(
        r#"
        select id, full_name, email, phone, address, created_at_utc
        from customers
        order by full_name asc, id asc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_customers failed")?;

    rows.iter().map(customer_from_row).collect()
}

/// Delete a customer. Their cart goes with them; their orders stay, detached.
pub async fn delete_customer(pool: &PgPool, customer_id: i64) -> Result<bool> {
    let res = sqlx::query("delete from customers where id = $1")
        .bind(customer_id)
        .execute(pool)
        .await
        .context("delete_customer failed")?;

    Ok(res.rows_affected() > 0)
}
