//! Request and error types exchanged with the fetcher

use std::time::Duration;

use lodestar_common::TransportErrorKind;

use crate::identity::IdentityMaterial;

/// One request issued by the navigation core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute request URL (at most 1024 bytes)
    pub url: String,
    /// Client certificate to present, if any
    pub identity: Option<IdentityMaterial>,
    /// Give up after this long
    pub timeout: Duration,
    /// Redirects the fetcher may follow on its own
    pub max_redirects: u32,
}

/// Failure before a response header was received
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server did not answer in time
    #[error("request timed out")]
    Timeout,

    /// DNS or TCP failure
    #[error("connection failed: {0}")]
    ConnectionFailure(String),

    /// TLS handshake failure or rejected server certificate
    #[error("TLS failure: {0}")]
    TlsFailure(String),
}

impl TransportError {
    /// Machine-readable category
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Timeout => TransportErrorKind::Timeout,
            Self::ConnectionFailure(_) => TransportErrorKind::ConnectionFailure,
            Self::TlsFailure(_) => TransportErrorKind::TlsFailure,
        }
    }
}
