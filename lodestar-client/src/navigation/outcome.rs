//! Navigation results and notifications

use lodestar_common::TransportErrorKind;
use uuid::Uuid;

use crate::history::{HistoryEntry, Viewport};
use crate::network::TransportError;

/// A page ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL the page was fetched from
    pub url: String,
    /// Response status (2x)
    pub status: u8,
    /// Response META line
    pub meta: String,
    /// MIME type without parameters
    pub mime_type: String,
    /// Response body
    pub body: Vec<u8>,
    /// Identity presented for the request, if any
    pub identity: Option<Uuid>,
    /// Viewport to restore (top of page for fresh fetches)
    pub viewport: Viewport,
}

impl Page {
    /// Page restored from history
    ///
    /// The identity is not recorded in history, so it is unknown here.
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            url: entry.url.clone(),
            status: entry.status,
            meta: entry.meta.clone(),
            mime_type: entry.mime_type.clone(),
            body: entry.content.clone(),
            identity: None,
            viewport: entry.viewport(),
        }
    }
}

/// Why a navigation failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// The server answered with a failure status (4x, 5x or unknown)
    #[error("server returned {status}: {meta}")]
    Status {
        /// Response status
        status: u8,
        /// Server message
        meta: String,
    },

    /// No response was received
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// More redirects than `max_redirects`
    #[error("too many redirects (limit {limit}) at {url}")]
    TooManyRedirects {
        /// Configured limit
        limit: u32,
        /// Last redirect target
        url: String,
    },

    /// The URL could not be requested
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// What is wrong with it
        reason: String,
    },

    /// An identity could not be used, created or regenerated
    #[error("identity error: {0}")]
    Identity(String),
}

impl Failure {
    /// Transport category, if this is a transport failure
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport(error) => Some(error.kind()),
            _ => None,
        }
    }
}

/// How a navigation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// A page is now displayed
    Displayed(Page),
    /// The navigation failed; nothing was displayed or recorded
    Failed(Failure),
    /// The user dismissed a prompt
    Cancelled,
    /// A newer navigation started; this one's result was discarded
    Superseded,
}

impl NavigationOutcome {
    /// The displayed page, if any
    pub fn page(&self) -> Option<&Page> {
        match self {
            Self::Displayed(page) => Some(page),
            _ => None,
        }
    }

    /// True if a page is now displayed
    pub fn is_displayed(&self) -> bool {
        matches!(self, Self::Displayed(_))
    }
}

/// Which persisted file a notice is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistedFile {
    /// identities.json
    Identities,
    /// session_identities.json
    SessionChoices,
}

/// Something the user should know that did not stop the navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A new identity was generated during a certificate prompt
    IdentityCreated {
        /// New identity
        id: Uuid,
        /// Its display name
        name: String,
    },
    /// An identity's certificate was replaced
    CertificateRegenerated {
        /// Regenerated identity
        id: Uuid,
    },
    /// A change could not be saved; it stays in effect for this session
    PersistenceFailed {
        /// File that could not be written
        file: PersistedFile,
        /// Error message
        message: String,
    },
}
