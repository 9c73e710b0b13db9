//! mj-checkout
//!
//! Cart-to-order reconciliation and order lifecycle rules.
//! - Cart gatekeeper: drop sold-out lines, clamp quantities to stock
//! - Strict stock verification used under row locks at placement time
//! - Pricing: subtotal, flat shipping fee below the free-shipping threshold
//! - Linear order status machine (placed -> shipped -> delivered)
//! - Guest tracking tokens
//! - Pure deterministic logic (no IO, no time, no DB wiring)

mod address;
mod cart;
mod pricing;
mod status;
mod tracking;

pub use address::{format_address, AddressParts, AddressScrubber};
pub use cart::{reconcile, verify_stock, CartAdjustment, CartLine, Reconciliation, StockShortfall};
pub use pricing::{
    initial_paid, quote, resolve_destination, CheckoutError, CheckoutRequest, PaymentMethod,
    Quote, ShippingOption, ShippingPolicy,
};
pub use status::{OrderStatus, Transition, TransitionError};
pub use tracking::{TrackingToken, TrackingTokenError};
