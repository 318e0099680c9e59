//! Gemini response vocabulary
//!
//! A Gemini response is a two-digit status, a META line and, for
//! successful responses only, a body. The first digit selects the
//! response class; [`StatusClass`] is that classification, computed once
//! and matched exhaustively by the navigation core.

use serde::{Deserialize, Serialize};

/// MIME type assumed when a success response carries an empty META
pub const DEFAULT_MIME_TYPE: &str = "text/gemini";

/// Status for a sensitive input request (input should be masked)
pub const STATUS_SENSITIVE_INPUT: u8 = 11;

/// Status for a permanent redirect
pub const STATUS_PERMANENT_REDIRECT: u8 = 31;

/// Status for "client certificate not authorised"
pub const STATUS_CERTIFICATE_NOT_AUTHORIZED: u8 = 61;

/// Status for "client certificate not valid"
pub const STATUS_CERTIFICATE_NOT_VALID: u8 = 62;

/// Response class derived from a numeric status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    /// 10-19: the server wants a line of input
    Input {
        /// Status 11: the input is sensitive (e.g. a password)
        sensitive: bool,
    },
    /// 20-29: body follows
    Success,
    /// 30-39: resource moved
    Redirect {
        /// Status 31
        permanent: bool,
    },
    /// 40-49
    TemporaryFailure,
    /// 50-59
    PermanentFailure,
    /// 60 and any 6x other than 61/62
    CertificateRequired,
    /// 61
    CertificateNotAuthorized,
    /// 62
    CertificateNotValid,
    /// Anything outside the defined ranges
    Unknown,
}

impl StatusClass {
    /// Classify a numeric status code
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            10..=19 => Self::Input {
                sensitive: code == STATUS_SENSITIVE_INPUT,
            },
            20..=29 => Self::Success,
            30..=39 => Self::Redirect {
                permanent: code == STATUS_PERMANENT_REDIRECT,
            },
            40..=49 => Self::TemporaryFailure,
            50..=59 => Self::PermanentFailure,
            STATUS_CERTIFICATE_NOT_AUTHORIZED => Self::CertificateNotAuthorized,
            STATUS_CERTIFICATE_NOT_VALID => Self::CertificateNotValid,
            60..=69 => Self::CertificateRequired,
            _ => Self::Unknown,
        }
    }
}

/// A response as reported by a fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Two-digit status code
    pub status: u8,
    /// META line: MIME type, prompt, redirect target or error message
    pub meta: String,
    /// Body bytes (success responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
    /// Redirect target when the fetcher stopped following redirects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl Response {
    /// Create a response without a body
    pub fn new(status: u8, meta: impl Into<String>) -> Self {
        Self {
            status,
            meta: meta.into(),
            body: None,
            redirect_url: None,
        }
    }

    /// Create a 20 response with the given MIME type and body
    pub fn success(mime_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 20,
            meta: mime_type.into(),
            body: Some(body.into()),
            redirect_url: None,
        }
    }

    /// Create a 30 response pointing at `target`
    pub fn redirect(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            status: 30,
            meta: target.clone(),
            body: None,
            redirect_url: Some(target),
        }
    }

    /// Classify this response's status
    #[must_use]
    pub fn class(&self) -> StatusClass {
        StatusClass::from_code(self.status)
    }

    /// MIME type of a success response, without parameters
    ///
    /// Falls back to [`DEFAULT_MIME_TYPE`] when META is blank.
    pub fn mime_type(&self) -> &str {
        let mime = self.meta.split(';').next().unwrap_or("").trim();
        if mime.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            mime
        }
    }

    /// Redirect target: the explicit redirect URL, else the META line
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty())
            .or_else(|| Some(self.meta.trim()).filter(|target| !target.is_empty()))
    }
}
