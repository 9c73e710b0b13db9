use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use mj_db::SalesFilter;
use sqlx::PgPool;

/// Build the filter; an inverted range is refused before touching the DB.
pub fn filter(
    customer_id: Option<i64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<SalesFilter> {
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            bail!("invalid range: --from {f} is after --to {t}");
        }
    }
    Ok(SalesFilter {
        customer_id,
        from,
        to,
    })
}

pub async fn export(pool: &PgPool, filter: &SalesFilter, out: &str) -> Result<()> {
    let report = mj_db::sales_report(pool, filter).await?;

    let file = File::create(out).with_context(|| format!("create csv failed: {out}"))?;
    report.write_csv(BufWriter::new(file))?;

    println!("sales_exported=true path={out}");
    println!("orders={}", report.order_count);
    println!("revenue_cents={}", report.total_revenue_cents);
    Ok(())
}
