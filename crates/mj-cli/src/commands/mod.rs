//! Command handler modules for mj-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod orders;
pub mod sales;

use anyhow::{Context, Result};
use mj_checkout::OrderStatus;
use mj_config::UnusedKeyPolicy;
use mj_db::MaintenanceReport;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI `--status` string into an [`OrderStatus`].
pub fn parse_status(s: &str) -> Result<OrderStatus> {
    OrderStatus::parse(s).with_context(|| {
        format!("invalid --status '{s}'. expected one of: PLACED | SHIPPED | DELIVERED")
    })
}

pub fn config_hash(paths: &[String], strict: bool) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = mj_config::load_layered_yaml(&path_refs)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = mj_config::report_unused_keys(&loaded.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        eprintln!("unused_key={p}");
    }

    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

pub fn print_maintenance(r: &MaintenanceReport) {
    println!("dry_run={}", r.dry_run);
    println!("customers_matched={}", r.customers_matched);
    println!("customers_updated={}", r.customers_updated);
    println!("orders_matched={}", r.orders_matched);
    println!("orders_updated={}", r.orders_updated);
    println!("carts_emptied={}", r.carts_emptied);
}
