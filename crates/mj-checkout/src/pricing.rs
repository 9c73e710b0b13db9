use serde::{Deserialize, Serialize};

use crate::address::{format_address, AddressParts};
use crate::cart::CartLine;

// ---------------------------------------------------------------------------
// Shipping / payment options
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingOption {
    /// Home delivery. Requires a street address.
    #[serde(rename = "standard")]
    HomeDelivery,
    /// Collect at the shop. Always free.
    #[serde(rename = "pickup", alias = "express")]
    StorePickup,
}

impl ShippingOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingOption::HomeDelivery => "HOME_DELIVERY",
            ShippingOption::StorePickup => "STORE_PICKUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HOME_DELIVERY" => Some(ShippingOption::HomeDelivery),
            "STORE_PICKUP" => Some(ShippingOption::StorePickup),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Simulated card gateway: the order counts as paid when placed.
    #[serde(rename = "gateway")]
    Gateway,
    /// Paid to the courier; becomes paid on delivery.
    #[serde(rename = "cod")]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Gateway => "GATEWAY",
            PaymentMethod::CashOnDelivery => "CASH_ON_DELIVERY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GATEWAY" => Some(PaymentMethod::Gateway),
            "CASH_ON_DELIVERY" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }
}

/// Paid flag at placement time.
pub fn initial_paid(method: PaymentMethod) -> bool {
    method == PaymentMethod::Gateway
}

// ---------------------------------------------------------------------------
// ShippingPolicy + Quote
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Home delivery is free at or above this subtotal.
    pub free_threshold_cents: i64,
    /// Fee charged for home delivery below the threshold.
    pub flat_fee_cents: i64,
    /// Destination recorded on store-pickup orders.
    pub pickup_address: String,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold_cents: 5_000,
            flat_fee_cents: 500,
            pickup_address: "Calle Jardines del Guadalquivir, 45, 41012 Sevilla".to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
}

/// Price a set of (already reconciled) lines.
pub fn quote(lines: &[CartLine], shipping: ShippingOption, policy: &ShippingPolicy) -> Quote {
    let subtotal_cents: i64 = lines.iter().map(CartLine::line_total_cents).sum();
    let shipping_cents = match shipping {
        ShippingOption::HomeDelivery if subtotal_cents < policy.free_threshold_cents => {
            policy.flat_fee_cents
        }
        _ => 0,
    };
    Quote {
        subtotal_cents,
        shipping_cents,
        total_cents: subtotal_cents + shipping_cents,
    }
}

// ---------------------------------------------------------------------------
// CheckoutRequest
// ---------------------------------------------------------------------------

/// Checkout form submitted by the customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping: ShippingOption,
    pub payment: PaymentMethod,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: AddressParts,
}

impl CheckoutRequest {
    /// Form-level checks that do not need the cart.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CheckoutError::InvalidEmail);
        }
        if self.shipping == ShippingOption::HomeDelivery && !self.address.has_street() {
            return Err(CheckoutError::MissingAddress);
        }
        Ok(())
    }
}

/// Where the order goes: the customer's address for home delivery, the
/// shop for pickup.
pub fn resolve_destination(
    shipping: ShippingOption,
    address: &AddressParts,
    policy: &ShippingPolicy,
) -> Result<String, CheckoutError> {
    match shipping {
        ShippingOption::HomeDelivery => {
            if !address.has_street() {
                return Err(CheckoutError::MissingAddress);
            }
            Ok(format_address(address))
        }
        ShippingOption::StorePickup => Ok(policy.pickup_address.clone()),
    }
}

// ---------------------------------------------------------------------------
// CheckoutError
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutError {
    EmptyCart,
    MissingAddress,
    InvalidEmail,
}

impl std::fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutError::EmptyCart => write!(f, "cart is empty"),
            CheckoutError::MissingAddress => {
                write!(f, "a street address is required for home delivery")
            }
            CheckoutError::InvalidEmail => write!(f, "a valid contact email is required"),
        }
    }
}

impl std::error::Error for CheckoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, qty: i32) -> CartLine {
        CartLine {
            product_id: 1,
            product_name: "p".into(),
            quantity: qty,
            unit_price_cents: price,
            stock: 100,
        }
    }

    #[test]
    fn home_delivery_below_threshold_pays_flat_fee() {
        let p = ShippingPolicy::default();
        let q = quote(&[line(1_000, 2), line(2_999, 1)], ShippingOption::HomeDelivery, &p);
        assert_eq!(q.subtotal_cents, 4_999);
        assert_eq!(q.shipping_cents, 500);
        assert_eq!(q.total_cents, 5_499);
    }

    #[test]
    fn home_delivery_at_threshold_is_free() {
        let p = ShippingPolicy::default();
        let q = quote(&[line(2_500, 2)], ShippingOption::HomeDelivery, &p);
        assert_eq!(q.shipping_cents, 0);
        assert_eq!(q.total_cents, 5_000);
    }

    #[test]
    fn pickup_is_always_free() {
        let p = ShippingPolicy::default();
        let q = quote(&[line(100, 1)], ShippingOption::StorePickup, &p);
        assert_eq!(q.shipping_cents, 0);
    }

    #[test]
    fn pickup_destination_is_the_shop() {
        let p = ShippingPolicy::default();
        let d = resolve_destination(ShippingOption::StorePickup, &AddressParts::default(), &p)
            .unwrap();
        assert_eq!(d, p.pickup_address);
        assert_eq!(
            resolve_destination(ShippingOption::HomeDelivery, &AddressParts::default(), &p),
            Err(CheckoutError::MissingAddress)
        );
    }

    #[test]
    fn only_gateway_is_paid_at_placement() {
        assert!(initial_paid(PaymentMethod::Gateway));
        assert!(!initial_paid(PaymentMethod::CashOnDelivery));
    }

    #[test]
    fn legacy_express_wire_value_means_pickup() {
        let s: ShippingOption = serde_json::from_str("\"express\"").unwrap();
        assert_eq!(s, ShippingOption::StorePickup);
    }

    #[test]
    fn request_validation() {
        let mut r = CheckoutRequest {
            shipping: ShippingOption::HomeDelivery,
            payment: PaymentMethod::Gateway,
            email: "ana@example.com".into(),
            phone: String::new(),
            address: AddressParts::default(),
        };
        assert_eq!(r.validate(), Err(CheckoutError::MissingAddress));
        r.shipping = ShippingOption::StorePickup;
        assert!(r.validate().is_ok());
        r.email = "nope".into();
        assert_eq!(r.validate(), Err(CheckoutError::InvalidEmail));
    }
}
