//! Order status machine.
//!
//! ```text
//!   Placed ──► Shipped ──► Delivered (terminal)
//!     └──────────────────────►┘
//! ```
//!
//! Transitions only move forward. Re-applying the current status is a no-op.
//! Reaching `Delivered` settles payment: cash-on-delivery orders become paid.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order placed and stock reserved.
    Placed,
    Shipped,
    /// **Terminal.**
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TransitionError> {
        match s.trim().to_uppercase().as_str() {
            "PLACED" => Ok(OrderStatus::Placed),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            other => Err(TransitionError::Unknown(other.to_string())),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Placed => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::Delivered => 2,
        }
    }

    /// Validate moving from `self` to `next`.
    pub fn transition(self, next: OrderStatus) -> Result<Transition, TransitionError> {
        if next == self {
            return Ok(Transition {
                from: self,
                to: next,
                changed: false,
                marks_paid: false,
            });
        }
        if next.rank() < self.rank() {
            return Err(TransitionError::Backwards {
                from: self,
                to: next,
            });
        }
        Ok(Transition {
            from: self,
            to: next,
            changed: true,
            marks_paid: next == OrderStatus::Delivered,
        })
    }
}

/// An accepted status change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// False when `from == to`; nothing is written.
    pub changed: bool,
    /// The order must be flagged paid (delivery settles COD).
    pub marks_paid: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionError {
    Backwards { from: OrderStatus, to: OrderStatus },
    Unknown(String),
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::Backwards { from, to } => write!(
                f,
                "illegal order transition: {} -> {}",
                from.as_str(),
                to.as_str()
            ),
            TransitionError::Unknown(s) => write!(f, "unknown order status: {s}"),
        }
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn forward_moves_are_accepted() {
        let t = Placed.transition(Shipped).unwrap();
        assert!(t.changed);
        assert!(!t.marks_paid);

        let t = Shipped.transition(Delivered).unwrap();
        assert!(t.marks_paid);

        // Skipping shipped is allowed (hand-delivered pickups).
        assert!(Placed.transition(Delivered).unwrap().marks_paid);
    }

    #[test]
    fn same_status_is_a_noop() {
        let t = Delivered.transition(Delivered).unwrap();
        assert!(!t.changed);
        assert!(!t.marks_paid);
    }

    #[test]
    fn backwards_moves_are_rejected() {
        assert_eq!(
            Delivered.transition(Shipped),
            Err(TransitionError::Backwards {
                from: Delivered,
                to: Shipped
            })
        );
        assert!(Shipped.transition(Placed).is_err());
    }

    #[test]
    fn parse_accepts_wire_names() {
        assert_eq!(OrderStatus::parse("shipped").unwrap(), Shipped);
        assert!(OrderStatus::parse("LOST").is_err());
    }
}
