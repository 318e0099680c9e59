//! Navigation state machine states

use std::fmt;

/// Where the current navigation of a view is
///
/// A navigation moves `ResolvingIdentity -> Fetching -> Interpreting` and
/// then either ends (`Displaying`, `ReportingError`) or enters a follow-up
/// state that loops back to `ResolvingIdentity` for the next request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NavState {
    /// Nothing has happened yet, or the last navigation was cancelled
    #[default]
    Idle,
    /// Deciding which identity to present
    ResolvingIdentity,
    /// Waiting for the fetcher
    Fetching,
    /// Classifying the response
    Interpreting,
    /// A page is displayed
    Displaying,
    /// About to request a redirect target
    FollowingRedirect,
    /// Waiting for the user to enter input
    AwaitingInput,
    /// Waiting for the user to choose an identity
    AwaitingIdentitySelection,
    /// Waiting for the user to repair a rejected certificate
    AwaitingCertificateRetry,
    /// The navigation failed
    ReportingError,
}

impl NavState {
    /// True for states in which a request is still in progress
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle | Self::Displaying | Self::ReportingError)
    }

    /// True while the navigation waits on the user
    pub fn is_prompting(&self) -> bool {
        matches!(
            self,
            Self::AwaitingInput | Self::AwaitingIdentitySelection | Self::AwaitingCertificateRetry
        )
    }

    /// Convert to the string representation used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingIdentity => "resolving_identity",
            Self::Fetching => "fetching",
            Self::Interpreting => "interpreting",
            Self::Displaying => "displaying",
            Self::FollowingRedirect => "following_redirect",
            Self::AwaitingInput => "awaiting_input",
            Self::AwaitingIdentitySelection => "awaiting_identity_selection",
            Self::AwaitingCertificateRetry => "awaiting_certificate_retry",
            Self::ReportingError => "reporting_error",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
