//! Syntactic screening of email addresses
//!
//! The acceptance rule is deliberately stricter than RFC 5321 and is part of
//! the system's contract: local part starts alphanumeric with up to 63 more
//! of `A-Za-z0-9._%+-`, domain starts alphanumeric with up to 253 more of
//! `A-Za-z0-9.-`, followed by a dot and an alphabetic TLD of length >= 2.

use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9][A-Za-z0-9._%+-]{0,63}@[A-Za-z0-9][A-Za-z0-9.-]{0,253}\.[A-Za-z]{2,}$",
    )
    .expect("address rule pattern is valid")
});

/// Check an address against the anchored acceptance rule.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RULE.is_match(address)
}

/// Split an address on its final `@` into (local part, domain).
///
/// Returns `None` when either side would be empty or there is no `@` at all.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    let (local, domain) = address.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some((local, domain))
}
