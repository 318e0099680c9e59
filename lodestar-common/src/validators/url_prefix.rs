//! URL prefix validation
//!
//! Identities are bound to URL prefixes and matched with a literal
//! `starts_with`, so a prefix must itself look like the start of an
//! absolute URL; otherwise it would silently match nothing (or everything).

use super::request_url::MAX_REQUEST_URL_LENGTH;

/// Maximum length for URL prefixes in bytes (a prefix longer than any
/// request URL can never match)
pub const MAX_URL_PREFIX_LENGTH: usize = MAX_REQUEST_URL_LENGTH;

/// Validation error for URL prefixes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlPrefixError {
    /// Prefix is empty
    #[error("URL prefix is empty")]
    Empty,
    /// Prefix exceeds maximum length
    #[error("URL prefix is longer than {MAX_URL_PREFIX_LENGTH} bytes")]
    TooLong,
    /// Prefix does not start with `scheme://host`
    #[error("URL prefix must start with scheme://host")]
    NotAbsolute,
    /// Prefix contains whitespace or control characters
    #[error("URL prefix contains whitespace or control characters")]
    InvalidCharacters,
}

/// Validate a URL prefix
///
/// Checks:
/// - Not empty
/// - Does not exceed maximum length (1024 bytes)
/// - Starts with `scheme://` followed by at least one host character
/// - No whitespace or control characters
///
/// # Errors
///
/// Returns a `UrlPrefixError` variant describing the validation failure.
pub fn validate_url_prefix(prefix: &str) -> Result<(), UrlPrefixError> {
    if prefix.is_empty() {
        return Err(UrlPrefixError::Empty);
    }

    if prefix.len() > MAX_URL_PREFIX_LENGTH {
        return Err(UrlPrefixError::TooLong);
    }

    if prefix
        .chars()
        .any(|ch| ch.is_whitespace() || ch.is_control())
    {
        return Err(UrlPrefixError::InvalidCharacters);
    }

    let Some((scheme, rest)) = prefix.split_once("://") else {
        return Err(UrlPrefixError::NotAbsolute);
    };

    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if !scheme_ok || rest.is_empty() || rest.starts_with('/') {
        return Err(UrlPrefixError::NotAbsolute);
    }

    Ok(())
}
