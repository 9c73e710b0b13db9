use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::taxonomy::{Category, Section};
use crate::types::Product;

// ---------------------------------------------------------------------------
// PriceBucket
// ---------------------------------------------------------------------------

/// Fixed storefront price ranges. Lower bound inclusive, upper exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBucket {
    Under50,
    From50To100,
    From100To500,
    Over500,
}

impl PriceBucket {
    pub const ALL: [PriceBucket; 4] = [
        PriceBucket::Under50,
        PriceBucket::From50To100,
        PriceBucket::From100To500,
        PriceBucket::Over500,
    ];

    /// `(min_cents, max_cents)`; `None` max means unbounded.
    pub fn bounds_cents(&self) -> (i64, Option<i64>) {
        match self {
            PriceBucket::Under50 => (0, Some(5_000)),
            PriceBucket::From50To100 => (5_000, Some(10_000)),
            PriceBucket::From100To500 => (10_000, Some(50_000)),
            PriceBucket::Over500 => (50_000, None),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceBucket::Under50 => "Under 50€",
            PriceBucket::From50To100 => "50€ - 100€",
            PriceBucket::From100To500 => "100€ - 500€",
            PriceBucket::Over500 => "Over 500€",
        }
    }

    pub fn contains(&self, price_cents: i64) -> bool {
        let (lo, hi) = self.bounds_cents();
        price_cents >= lo && hi.map_or(true, |h| price_cents < h)
    }
}

// ---------------------------------------------------------------------------
// ProductFilter
// ---------------------------------------------------------------------------

/// Storefront filter. Every populated field must match (AND).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring over name, description and manufacturer.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub section: Option<Section>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub price_bucket: Option<PriceBucket>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl ProductFilter {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Normalized query: trimmed, `None` when blank.
    pub fn query_term(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn matches(&self, p: &Product) -> bool {
        if let Some(q) = self.query_term() {
            let q = q.to_lowercase();
            let hit = p.name.to_lowercase().contains(&q)
                || p.description.to_lowercase().contains(&q)
                || p.manufacturer.to_lowercase().contains(&q);
            if !hit {
                return false;
            }
        }
        if self.section.is_some_and(|s| s != p.section) {
            return false;
        }
        if self.category.is_some_and(|c| c != p.category) {
            return false;
        }
        if let Some(m) = self.manufacturer.as_deref().filter(|m| !m.is_empty()) {
            if p.manufacturer != m {
                return false;
            }
        }
        if self.price_bucket.is_some_and(|b| !b.contains(p.price_cents)) {
            return false;
        }
        if self.in_stock_only && !p.in_stock() {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// FilterOptions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBucketOption {
    pub bucket: PriceBucket,
    pub label: String,
    pub min_cents: i64,
    pub max_cents: Option<i64>,
}

/// Options rendered in the storefront filter sidebar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Distinct manufacturers, sorted.
    pub manufacturers: Vec<String>,
    pub price_buckets: Vec<PriceBucketOption>,
}

impl FilterOptions {
    pub fn from_manufacturers<I, S>(manufacturers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = manufacturers
            .into_iter()
            .map(Into::into)
            .filter(|m| !m.is_empty())
            .collect();
        Self {
            manufacturers: set.into_iter().collect(),
            price_buckets: PriceBucket::ALL
                .into_iter()
                .map(|b| {
                    let (min_cents, max_cents) = b.bounds_cents();
                    PriceBucketOption {
                        bucket: b,
                        label: b.label().to_string(),
                        min_cents,
                        max_cents,
                    }
                })
                .collect(),
        }
    }
}
