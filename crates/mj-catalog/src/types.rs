use serde::{Deserialize, Serialize};

use crate::taxonomy::{Category, Section};

/// A catalog product as stored.
///
/// `price_cents` is the current unit price. Order lines copy it at placement,
/// so later price edits never rewrite history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub department: String,
    pub section: Section,
    pub manufacturer: String,
    pub category: Category,
    pub price_cents: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub sold_out: bool,
    pub featured: bool,
    /// Manual listing order (ascending).
    pub position: i32,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Admin input for creating or editing a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    pub section: Section,
    #[serde(default)]
    pub manufacturer: String,
    pub category: Category,
    pub price_cents: i64,
    pub stock: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sold_out: bool,
    #[serde(default)]
    pub featured: bool,
}
