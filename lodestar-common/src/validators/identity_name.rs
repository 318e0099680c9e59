//! Identity name validation
//!
//! Identity names are shown in selection prompts and stored in the
//! identities file; they are free text but must be a single printable line.

/// Maximum length for identity names in bytes
pub const MAX_IDENTITY_NAME_LENGTH: usize = 64;

/// Validation error for identity names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityNameError {
    /// Name is empty or contains only whitespace
    #[error("identity name is empty")]
    Empty,
    /// Name exceeds maximum length
    #[error("identity name is longer than {MAX_IDENTITY_NAME_LENGTH} bytes")]
    TooLong,
    /// Name contains control characters (including newlines)
    #[error("identity name contains control characters")]
    InvalidCharacters,
}

/// Validate an identity name
///
/// Checks:
/// - Not empty or whitespace-only
/// - Does not exceed maximum length (64 bytes)
/// - No control characters
///
/// # Errors
///
/// Returns an `IdentityNameError` variant describing the validation failure.
pub fn validate_identity_name(name: &str) -> Result<(), IdentityNameError> {
    if name.trim().is_empty() {
        return Err(IdentityNameError::Empty);
    }

    if name.len() > MAX_IDENTITY_NAME_LENGTH {
        return Err(IdentityNameError::TooLong);
    }

    if name.chars().any(char::is_control) {
        return Err(IdentityNameError::InvalidCharacters);
    }

    Ok(())
}
