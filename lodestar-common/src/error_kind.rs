//! Machine-readable transport failure kinds
//!
//! A fetch can fail before any response arrives. These kinds let the
//! presentation layer pick a message (e.g. suggest retrying later on a
//! timeout) without parsing error strings.

use std::fmt;

/// Categories of transport failure reported by a fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The server did not answer within the configured timeout
    Timeout,

    /// DNS resolution or the TCP connection failed
    ConnectionFailure,

    /// The TLS handshake failed or the server certificate was rejected
    TlsFailure,
}

impl TransportErrorKind {
    /// Convert to the string representation used in logs and notices
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection_failure",
            Self::TlsFailure => "tls_failure",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(Self::Timeout),
            "connection_failure" => Some(Self::ConnectionFailure),
            "tls_failure" => Some(Self::TlsFailure),
            _ => None,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TransportErrorKind> for String {
    fn from(kind: TransportErrorKind) -> Self {
        kind.as_str().to_string()
    }
}
