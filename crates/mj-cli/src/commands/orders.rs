use anyhow::{bail, Result};
use mj_catalog::format_cents;
use mj_checkout::OrderStatus;
use mj_db::StatusChange;
use sqlx::PgPool;
use tracing::info;

/// Status changes made here are attributed to this actor in the history.
const CLI_ACTOR: &str = "cli";

pub async fn list(pool: &PgPool, status: Option<OrderStatus>, customer_id: Option<i64>) -> Result<()> {
    let orders = mj_db::list_orders(pool, status, customer_id).await?;
    for o in &orders {
        println!(
            "order_id={} status={} paid={} placed_at_utc={} total={} email={} customer_id={}",
            o.id,
            o.status.as_str(),
            o.paid,
            o.placed_at_utc.to_rfc3339(),
            format_cents(o.total_cents),
            o.email,
            o.customer_id.map(|id| id.to_string()).unwrap_or_default()
        );
    }
    println!("orders={}", orders.len());
    Ok(())
}

pub async fn set_status(pool: &PgPool, order_id: i64, next: OrderStatus, notes: &str) -> Result<()> {
    match mj_db::set_order_status(pool, order_id, next, CLI_ACTOR, notes).await? {
        StatusChange::Applied { transition, order } => {
            info!(order_id, to = transition.to.as_str(), "order status set from cli");
            println!(
                "changed=true order_id={} from={} to={} paid={}",
                order.id,
                transition.from.as_str(),
                transition.to.as_str(),
                order.paid
            );
        }
        StatusChange::Unchanged(order) => {
            println!(
                "changed=false order_id={} status={}",
                order.id,
                order.status.as_str()
            );
        }
        StatusChange::Refused(e) => bail!("REFUSED: {e}"),
        StatusChange::NotFound => bail!("order not found: {order_id}"),
    }
    Ok(())
}
