use serde::{Deserialize, Serialize};

use crate::taxonomy::categories_for;
use crate::types::ProductDraft;

/// One rejected field of a [`ProductDraft`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate an admin product draft. Collects every violation.
pub fn validate_draft(d: &ProductDraft) -> Result<(), Vec<FieldViolation>> {
    let mut out = Vec::new();

    if d.name.trim().is_empty() {
        out.push(FieldViolation::new("name", "name is required"));
    }
    if d.price_cents < 0 {
        out.push(FieldViolation::new("price_cents", "price must be >= 0"));
    }
    if d.stock < 0 {
        out.push(FieldViolation::new("stock", "stock must be >= 0"));
    }

    // sold_out must mirror stock exactly.
    if d.stock > 0 && d.sold_out {
        out.push(FieldViolation::new(
            "sold_out",
            "cannot mark sold out while stock is greater than 0",
        ));
    }
    if d.stock == 0 && !d.sold_out {
        out.push(FieldViolation::new(
            "sold_out",
            "stock is 0; the product must be marked sold out",
        ));
    }

    let allowed = categories_for(d.section);
    if !allowed.contains(&d.category) {
        let names: Vec<&str> = allowed.iter().map(|c| c.as_str()).collect();
        out.push(FieldViolation::new(
            "category",
            format!(
                "category {} is not valid for section {}; expected one of: {}",
                d.category.as_str(),
                d.section.as_str(),
                names.join(", ")
            ),
        ));
    }

    if out.is_empty() {
        Ok(())
    } else {
        Err(out)
    }
}
