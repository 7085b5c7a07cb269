use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_SHAPE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Whether the address has the `local@domain.tld` shape.
pub fn is_well_formed(address: &str) -> bool {
    match ADDRESS_SHAPE.as_ref() {
        Some(pattern) => pattern.is_match(address),
        None => false,
    }
}

/// Splits a comma separated cc list, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// One malformed address, attributed to the field it was typed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressIssue {
    pub field: &'static str,
    pub address: String,
}

impl AddressIssue {
    pub fn new(field: &'static str, address: impl Into<String>) -> Self {
        Self {
            field,
            address: address.into(),
        }
    }
}

impl fmt::Display for AddressIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid address `{}` in {}", self.address, self.field)
    }
}

/// Checks a single-address field. Empty input is left to required-field checks.
pub fn check_single(field: &'static str, raw: &str) -> Vec<AddressIssue> {
    let address = raw.trim();
    if address.is_empty() || is_well_formed(address) {
        Vec::new()
    } else {
        vec![AddressIssue::new(field, address)]
    }
}

/// Checks every entry of a comma separated list, reporting each bad one.
pub fn check_list(field: &'static str, raw: &str) -> Vec<AddressIssue> {
    split_list(raw)
        .into_iter()
        .filter(|address| !is_well_formed(address))
        .map(|address| AddressIssue::new(field, address))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_shape_requires_domain_dot() {
        assert!(is_well_formed("adjuster@example.com"));
        assert!(!is_well_formed("adjuster@example"));
        assert!(!is_well_formed("two words@example.com"));
        assert!(!is_well_formed(""));
    }

    #[test]
    fn list_reports_every_bad_entry() {
        let issues = check_list("cc-emails", "ok@a.io, bad@, , also bad, fine@b.org");
        assert_eq!(
            issues,
            vec![
                AddressIssue::new("cc-emails", "bad@"),
                AddressIssue::new("cc-emails", "also bad"),
            ]
        );
    }

    #[test]
    fn empty_single_address_is_not_a_format_issue() {
        assert!(check_single("recipient-email", "  ").is_empty());
        assert_eq!(check_single("recipient-email", "nope").len(), 1);
    }
}
