//! Lodestar Common Library
//!
//! Protocol vocabulary shared by Lodestar front ends: response status
//! classification, URL helpers, transport error kinds, validators and
//! certificate fingerprint hashing.

mod error_kind;
pub mod hash;
pub mod protocol;
pub mod url;
pub mod validators;

pub use error_kind::TransportErrorKind;

/// URL scheme spoken by the client
pub const GEMINI_SCHEME: &str = "gemini";

/// Default port for Gemini connections
pub const DEFAULT_PORT: u16 = 1965;

/// Buffer size for SHA-256 hashing operations (64KB, certificates are small)
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;
