//! Address syntax checks. Pure, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.+\-]+@[a-zA-Z0-9\-]+\.[a-zA-Z0-9\-.]+$")
        .expect("Email syntax pattern failed to compile. This is a bug.")
});

/// Returns true when `address` matches the accepted address shape:
/// one `@`, a local part of word characters, `.`, `+` or `-`, and a dotted
/// domain of alphanumerics and hyphens.
pub fn check(address: &str) -> bool {
    EMAIL_SYNTAX.is_match(address)
}

/// Splits a syntactically valid address into `(local_part, domain)`.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    if !check(address) {
        return None;
    }
    address.split_once('@')
}
