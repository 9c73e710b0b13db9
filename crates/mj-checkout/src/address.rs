use regex::Regex;
use serde::{Deserialize, Serialize};

/// Postal address as entered on the checkout form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl AddressParts {
    /// Split a stored one-line address back into its parts.
    ///
    /// Needs at least three comma separated pieces; otherwise everything is
    /// returned as the street.
    pub fn from_stored(stored: &str) -> Self {
        let parts: Vec<&str> = stored.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return Self {
                street: stored.trim().to_string(),
                ..Self::default()
            };
        }
        let (zip, city) = match parts[1].split_once(' ') {
            Some((z, c)) => (z.trim().to_string(), c.trim().to_string()),
            None => (parts[1].to_string(), String::new()),
        };
        Self {
            street: parts[0].to_string(),
            zip,
            city,
            country: parts[parts.len() - 1].to_string(),
        }
    }

    pub fn has_street(&self) -> bool {
        !self.street.trim().is_empty()
    }
}

/// One-line postal address: `"{street}, {zip} {city}, {country}"`.
pub fn format_address(a: &AddressParts) -> String {
    format!(
        "{}, {} {}, {}",
        a.street.trim(),
        a.zip.trim(),
        a.city.trim(),
        a.country.trim()
    )
}

/// Scrubs literal `None` words left behind by stringified empty fields.
#[derive(Debug, Clone)]
pub struct AddressScrubber {
    none_word: Regex,
}

impl AddressScrubber {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            none_word: Regex::new(r"\(\s*None\s*\)|\bNone\b")?,
        })
    }

    /// The cleaned address, or `None` when there is no `None` word to drop
    /// (`Nonell` is a street name, not a placeholder).
    ///
    /// Cleaning collapses repeated separators and whitespace and strips
    /// leading/trailing commas.
    pub fn clean_address(&self, s: &str) -> Option<String> {
        if !self.none_word.is_match(s) {
            return None;
        }
        let stripped = self.none_word.replace_all(s, "");
        Some(
            stripped
                .split(',')
                .map(|segment| {
                    segment
                        .split_whitespace()
                        .filter(|w| w.chars().any(|c| c.is_alphanumeric()) || w.len() > 1)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|segment| !segment.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_split_keeps_parts() {
        let a = AddressParts {
            street: "Calle Betis 3".into(),
            zip: "41010".into(),
            city: "Sevilla".into(),
            country: "España".into(),
        };
        let line = format_address(&a);
        assert_eq!(line, "Calle Betis 3, 41010 Sevilla, España");
        assert_eq!(AddressParts::from_stored(&line), a);
    }

    #[test]
    fn short_stored_address_becomes_street() {
        let a = AddressParts::from_stored("Plaza Nueva");
        assert_eq!(a.street, "Plaza Nueva");
        assert!(a.zip.is_empty());
    }

    fn scrub(s: &str) -> Option<String> {
        AddressScrubber::new().unwrap().clean_address(s)
    }

    #[test]
    fn clean_address_drops_none_words() {
        assert_eq!(scrub("None, None None, None").as_deref(), Some(""));
        assert_eq!(
            scrub("Calle Feria 2, None  Sevilla, España").as_deref(),
            Some("Calle Feria 2, Sevilla, España")
        );
        assert_eq!(
            scrub("Calle Sol 3 (None), None. Cádiz").as_deref(),
            Some("Calle Sol 3, Cádiz")
        );
        assert_eq!(
            scrub(" , Calle Sol,, None,Cádiz , ").as_deref(),
            Some("Calle Sol, Cádiz")
        );
    }

    #[test]
    fn clean_address_leaves_rows_without_none_words_alone() {
        assert_eq!(scrub("Calle Nonell 4,Barcelona"), None);
        assert_eq!(scrub("NONE street"), None);
        assert_eq!(scrub("Calle Sol,, Cádiz"), None);
    }

    #[test]
    fn clean_address_is_idempotent() {
        let once = scrub("None, Av. Constitución  1 , None 41001 Sevilla,").unwrap();
        assert_eq!(once, "Av. Constitución 1, 41001 Sevilla");
        assert_eq!(scrub(&once), None);
    }
}
