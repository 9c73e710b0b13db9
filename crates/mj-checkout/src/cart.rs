use serde::{Deserialize, Serialize};

/// One cart line joined with the product's current stock and price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    /// Stock as read together with the line (locked rows at placement time).
    pub stock: i32,
}

impl CartLine {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// A change the gatekeeper made to a cart before letting it through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartAdjustment {
    /// Product is out of stock; the line was dropped.
    Removed { product_id: i64, name: String },
    /// Quantity exceeded stock; the line was reduced to what is left.
    Clamped {
        product_id: i64,
        name: String,
        from: i32,
        to: i32,
    },
}

impl CartAdjustment {
    pub fn product_id(&self) -> i64 {
        match self {
            CartAdjustment::Removed { product_id, .. } => *product_id,
            CartAdjustment::Clamped { product_id, .. } => *product_id,
        }
    }

    /// Customer-facing notice.
    pub fn message(&self) -> String {
        match self {
            CartAdjustment::Removed { name, .. } => {
                format!("'{name}' has just sold out and was removed from your cart.")
            }
            CartAdjustment::Clamped { name, to, .. } => {
                format!("Only {to} unit(s) of '{name}' are left. Your cart was adjusted.")
            }
        }
    }
}

/// Result of running the gatekeeper over a cart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Lines after adjustment (removed lines are absent, clamped lines reduced).
    pub keep: Vec<CartLine>,
    pub adjustments: Vec<CartAdjustment>,
}

impl Reconciliation {
    /// True when the cart passed unchanged and may proceed to placement.
    pub fn is_clean(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// Reconcile cart lines against current stock.
///
/// - stock <= 0: line removed
/// - quantity > stock: quantity clamped to stock
pub fn reconcile(lines: &[CartLine]) -> Reconciliation {
    let mut out = Reconciliation::default();
    for line in lines {
        if line.stock <= 0 {
            out.adjustments.push(CartAdjustment::Removed {
                product_id: line.product_id,
                name: line.product_name.clone(),
            });
        } else if line.quantity > line.stock {
            out.adjustments.push(CartAdjustment::Clamped {
                product_id: line.product_id,
                name: line.product_name.clone(),
                from: line.quantity,
                to: line.stock,
            });
            out.keep.push(CartLine {
                quantity: line.stock,
                ..line.clone()
            });
        } else {
            out.keep.push(line.clone());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// StockShortfall
// ---------------------------------------------------------------------------

/// First line found whose quantity cannot be served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_id: i64,
    pub name: String,
    pub requested: i32,
    pub available: i32,
}

impl std::fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "insufficient stock for product {} ({}): requested {}, available {}",
            self.product_id, self.name, self.requested, self.available
        )
    }
}

impl std::error::Error for StockShortfall {}

/// Strict check: every line must be servable from stock, and quantities
/// must be positive.
pub fn verify_stock(lines: &[CartLine]) -> Result<(), StockShortfall> {
    match lines
        .iter()
        .find(|l| l.quantity <= 0 || l.quantity > l.stock)
    {
        Some(l) => Err(StockShortfall {
            product_id: l.product_id,
            name: l.product_name.clone(),
            requested: l.quantity,
            available: l.stock.max(0),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, qty: i32, stock: i32) -> CartLine {
        CartLine {
            product_id: id,
            product_name: format!("p{id}"),
            quantity: qty,
            unit_price_cents: 1_000,
            stock,
        }
    }

    #[test]
    fn clean_cart_passes_untouched() {
        let lines = vec![line(1, 2, 5), line(2, 5, 5)];
        let r = reconcile(&lines);
        assert!(r.is_clean());
        assert_eq!(r.keep, lines);
    }

    #[test]
    fn sold_out_lines_are_removed_and_excess_is_clamped() {
        let r = reconcile(&[line(1, 2, 0), line(2, 7, 3), line(3, 1, 9)]);
        assert!(!r.is_clean());
        assert_eq!(
            r.adjustments,
            vec![
                CartAdjustment::Removed {
                    product_id: 1,
                    name: "p1".into()
                },
                CartAdjustment::Clamped {
                    product_id: 2,
                    name: "p2".into(),
                    from: 7,
                    to: 3
                },
            ]
        );
        let kept: Vec<(i64, i32)> = r.keep.iter().map(|l| (l.product_id, l.quantity)).collect();
        assert_eq!(kept, vec![(2, 3), (3, 1)]);
    }

    #[test]
    fn negative_stock_counts_as_sold_out() {
        let r = reconcile(&[line(1, 1, -2)]);
        assert!(r.keep.is_empty());
        assert_eq!(r.adjustments.len(), 1);
    }

    #[test]
    fn verify_stock_reports_first_short_line() {
        assert!(verify_stock(&[line(1, 5, 5)]).is_ok());
        let e = verify_stock(&[line(1, 1, 5), line(2, 4, 3), line(3, 9, 1)]).unwrap_err();
        assert_eq!(e.product_id, 2);
        assert_eq!(e.requested, 4);
        assert_eq!(e.available, 3);
    }

    #[test]
    fn verify_stock_rejects_non_positive_quantity() {
        assert!(verify_stock(&[line(1, 0, 5)]).is_err());
    }
}
