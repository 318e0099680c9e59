//! Lodestar navigation core
//!
//! The part of a Gemini client between the user and the network:
//!
//! - [`history`] - bounded back/forward stack per view
//! - [`identity`] - client certificates, URL-prefix bindings and the
//!   per-authority session choice
//! - [`navigation`] - the status-driven state machine that resolves the
//!   identity, fetches, and follows redirects, input requests and
//!   certificate negotiation
//! - [`config`] - settings and the on-disk layout
//!
//! Wire I/O, certificate generation and user prompts are supplied by the
//! embedding application through the [`network::Fetcher`],
//! [`identity::CredentialProvider`] and [`prompt::Prompter`] traits.
//!
//! The crate logs through the `log` facade and never installs a logger.

pub mod config;
pub mod constants;
pub mod history;
pub mod identity;
pub mod navigation;
pub mod network;
pub mod prompt;
pub mod storage;

pub use config::{Config, IdentityPrompt, Settings};
pub use history::{HistoryEntry, HistoryStack, Viewport};
pub use identity::{
    CredentialProvider, Identity, IdentityError, IdentityStore, SessionChoice,
    SessionIdentityCache,
};
pub use navigation::{
    Failure, NavState, NavigateOptions, NavigationController, NavigationOutcome, Notice, Page,
};
pub use network::{FetchRequest, Fetcher, TransportError};
pub use prompt::Prompter;
