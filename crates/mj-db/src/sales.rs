use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

/// Sales are delivered orders. Dates are UTC calendar days, both inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFilter {
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRow {
    pub order_id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub email: String,
    pub placed_at_utc: DateTime<Utc>,
    pub payment: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub filter: SalesFilter,
    /// Newest first.
    pub rows: Vec<SalesRow>,
    pub order_count: i64,
    pub total_revenue_cents: i64,
}

pub async fn sales_report(pool: &PgPool, filter: &SalesFilter) -> Result<SalesReport> {
    let rows = sqlx::query(
        r#"
        select o.id, o.customer_id, c.full_name, o.email, o.placed_at_utc, o.payment, o.total_cents
        from orders o
        left join customers c on c.id = o.customer_id
        where o.status = 'DELIVERED'
          and ($1::bigint is null or o.customer_id = $1)
          and ($2::date is null or (o.placed_at_utc at time zone 'UTC')::date >= $2)
          and ($3::date is null or (o.placed_at_utc at time zone 'UTC')::date <= $3)
        order by o.placed_at_utc desc, o.id desc
        "#,
    )
    .bind(filter.customer_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(pool)
    .await
    .context("sales_report failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(SalesRow {
            order_id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            customer_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            placed_at_utc: row.try_get("placed_at_utc")?,
            payment: row.try_get("payment")?,
            total_cents: row.try_get("total_cents")?,
        });
    }

    Ok(SalesReport {
        filter: filter.clone(),
        order_count: out.len() as i64,
        total_revenue_cents: out.iter().map(|r| r.total_cents).sum(),
        rows: out,
    })
}

impl SalesReport {
    /// One CSV row per sale plus a trailing TOTAL row.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(w);
        wtr.write_record([
            "order_id",
            "placed_at_utc",
            "customer_id",
            "customer_name",
            "email",
            "payment",
            "total",
        ])
        .context("write csv header failed")?;

        for r in &self.rows {
            wtr.write_record([
                r.order_id.to_string(),
                r.placed_at_utc.to_rfc3339(),
                r.customer_id.map(|id| id.to_string()).unwrap_or_default(),
                r.customer_name.clone().unwrap_or_default(),
                r.email.clone(),
                r.payment.clone(),
                mj_catalog::format_cents(r.total_cents),
            ])
            .with_context(|| format!("write csv row failed: order_id={}", r.order_id))?;
        }

        wtr.write_record([
            "TOTAL".to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            format!("{} orders", self.order_count),
            mj_catalog::format_cents(self.total_revenue_cents),
        ])
        .context("write csv total failed")?;

        wtr.flush().context("flush csv failed")?;
        Ok(())
    }
}
