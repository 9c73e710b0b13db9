//! Request and response types for the mj-daemon HTTP endpoints.
//!
//! Domain types from mj-catalog / mj-checkout / mj-db are returned directly
//! where their JSON shape is already right; the wrappers here only add
//! envelope fields. No business logic lives here.

use std::collections::BTreeMap;

use mj_catalog::{Category, FieldViolation, Product};
use mj_checkout::{
    CartAdjustment, CartLine, OrderStatus, PaymentMethod, ShippingOption,
};
use mj_db::{OrderLineRow, OrderRow, StatusHistoryRow};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Per-field problems, only for `VALIDATION_FAILED`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldViolation>,
}

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub db_configured: bool,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    pub related: Vec<Product>,
}

/// `?ids=1,2,3`
#[derive(Debug, Clone, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub ids: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockResponse {
    /// product id -> units on hand; unknown ids are absent.
    pub stock: BTreeMap<i64, i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryOption {
    pub slug: Category,
    pub title: String,
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub item_count: i64,
    pub subtotal_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub action: CartAction,
    /// Units to add. `remove` always takes one unit off.
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedResponse {
    pub removed_lines: u64,
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutQuery {
    #[serde(default = "default_shipping")]
    pub shipping: ShippingOption,
}

fn default_shipping() -> ShippingOption {
    ShippingOption::HomeDelivery
}

/// 409 body when stock moved under the cart: nothing was ordered, the cart
/// now holds the adjusted quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartAdjustedResponse {
    pub error: String,
    pub code: String,
    pub adjustments: Vec<CartAdjustment>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    pub shipping: ShippingOption,
    pub payment: PaymentMethod,
    pub paid: bool,
    pub destination: String,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    /// Guests need this to look the order up later.
    pub tracking_token: String,
    pub tracking_url: String,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Tracking page and admin order detail.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetailResponse {
    pub order: OrderRow,
    pub lines: Vec<OrderLineRow>,
    pub history: Vec<StatusHistoryRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetStatusResponse {
    pub changed: bool,
    pub order: OrderRow,
}

// ---------------------------------------------------------------------------
// Admin catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub updated: u64,
}
