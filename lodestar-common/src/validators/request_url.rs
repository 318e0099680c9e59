//! Request URL validation
//!
//! A Gemini request is the absolute URL followed by CRLF, and servers
//! reject URLs longer than 1024 bytes. Input collected for a status 1x
//! prompt is appended as the query, so the limit has to be checked after
//! percent-encoding.
//!
//! Note: Length is measured in bytes of the encoded URL, not characters.

/// Maximum length of a request URL in bytes
pub const MAX_REQUEST_URL_LENGTH: usize = 1024;

/// Validation error for request URLs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestUrlError {
    /// URL is empty or whitespace-only
    #[error("URL is empty")]
    Empty,
    /// URL exceeds the protocol limit
    #[error("URL is {length} bytes, the limit is {MAX_REQUEST_URL_LENGTH}")]
    TooLong {
        /// Encoded length in bytes
        length: usize,
    },
}

/// Validate a request URL
///
/// Checks:
/// - Not empty or whitespace-only
/// - Does not exceed 1024 bytes
///
/// # Errors
///
/// Returns a `RequestUrlError` variant describing the validation failure.
pub fn validate_request_url(url: &str) -> Result<(), RequestUrlError> {
    if url.trim().is_empty() {
        return Err(RequestUrlError::Empty);
    }

    if url.len() > MAX_REQUEST_URL_LENGTH {
        return Err(RequestUrlError::TooLong { length: url.len() });
    }

    Ok(())
}

/// Bytes left for an encoded query on `base_url`
///
/// Accounts for the `?` separator and any query already present on
/// `base_url` (which will be replaced).
pub fn remaining_query_bytes(base_url: &str) -> usize {
    let base = base_url.split_once('#').map_or(base_url, |(rest, _)| rest);
    let base = base.split_once('?').map_or(base, |(rest, _)| rest);
    MAX_REQUEST_URL_LENGTH.saturating_sub(base.len() + 1)
}
