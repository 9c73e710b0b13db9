//! mj-catalog
//!
//! Catalog domain model for the garden shop.
//! - Section / category taxonomy and the section -> category constraint
//! - Product + admin draft validation (stock vs sold-out consistency)
//! - Simple field-matching filters and fixed price buckets
//! - Pure deterministic logic (no IO, no time, no DB wiring)

mod filter;
mod taxonomy;
mod types;
mod validate;

pub use filter::{FilterOptions, PriceBucket, ProductFilter};
pub use taxonomy::{categories_for, section_of, Category, Section, TaxonomyError};
pub use types::{Product, ProductDraft};
pub use validate::{validate_draft, FieldViolation};

/// Money scale: cents (1e-2).
pub const CENTS_SCALE: i64 = 100;

/// Render integer cents as a plain decimal string ("12.34", "-0.05").
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{sign}{}.{:02}",
        abs / CENTS_SCALE as u64,
        abs % CENTS_SCALE as u64
    )
}
