//! User interaction collaborator
//!
//! Some responses need a decision from the user before the request can be
//! retried: a line of input (status 1x), which identity to present
//! (status 60, or several bound identities), or how to repair a rejected
//! certificate (status 61/62). The navigation core suspends on these
//! prompts; a prompt still pending when a newer navigation starts is
//! dropped.

use uuid::Uuid;

use crate::identity::Identity;

/// Request for a line of input (status 10/11)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequest {
    /// URL that asked for input
    pub url: String,
    /// Prompt text from the server's META line
    pub prompt: String,
    /// Mask the input (status 11)
    pub sensitive: bool,
    /// Bytes available for the percent-encoded input
    pub max_encoded_bytes: usize,
    /// Encoded size of the previous answer when it was rejected as too long
    pub rejected_bytes: Option<usize>,
}

/// Why an identity selection is being asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionReason {
    /// Several bound identities match and nothing is remembered
    Ambiguous,
    /// The server requires a certificate (status 60)
    Required {
        /// Server message from the META line
        message: String,
    },
}

/// Request to pick the identity for a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    /// URL being requested
    pub url: String,
    /// Why the prompt is shown
    pub reason: SelectionReason,
    /// Usable identities, those bound to the URL first
    pub candidates: Vec<Identity>,
    /// Whether creating a new identity is offered
    pub allow_create: bool,
}

/// What the user picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Use an existing identity
    Existing(Uuid),
    /// Generate a new identity with this name
    Create {
        /// Display name for the new identity
        name: String,
    },
}

/// Answer to a [`SelectionRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChoice {
    /// The chosen identity
    pub selection: Selection,
    /// Also bind the identity to this URL's authority
    pub remember: bool,
}

impl SelectionChoice {
    /// Use `id` for this session only
    pub fn existing(id: Uuid) -> Self {
        Self {
            selection: Selection::Existing(id),
            remember: false,
        }
    }

    /// Use `id` and bind it to the authority
    pub fn remember(id: Uuid) -> Self {
        Self {
            selection: Selection::Existing(id),
            remember: true,
        }
    }
}

/// Kind of certificate rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairKind {
    /// Status 61: the certificate is not authorised for this resource
    NotAuthorized,
    /// Status 62: the certificate is not valid
    NotValid,
}

/// Request to repair a rejected certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairRequest {
    /// URL that rejected the certificate
    pub url: String,
    /// Rejection kind
    pub kind: RepairKind,
    /// Server message from the META line
    pub message: String,
    /// Identity that was presented, if any
    pub current: Option<Identity>,
    /// Other usable identities to switch to
    pub candidates: Vec<Identity>,
}

/// Answer to a [`RepairRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    /// Retry with another identity
    Switch(Uuid),
    /// Replace the current identity's certificate and retry
    Regenerate,
}

/// Asks the user for decisions
///
/// Every method returns `None` when the user dismisses the prompt.
#[async_trait::async_trait]
pub trait Prompter: Send + Sync {
    /// Ask for a line of input
    async fn ask_input(&self, request: InputRequest) -> Option<String>;

    /// Ask which identity to present
    ///
    /// For [`SelectionReason::Ambiguous`] a dismissal means "continue
    /// without an identity" and is remembered for the authority. For
    /// [`SelectionReason::Required`] it ends the navigation.
    async fn ask_identity_selection(&self, request: SelectionRequest) -> Option<SelectionChoice>;

    /// Ask how to recover from a rejected certificate
    async fn ask_identity_repair(&self, request: RepairRequest) -> Option<RepairAction>;
}
