//! Navigation orchestration
//!
//! [`NavigationController`] ties the stores, the fetcher and the prompter
//! together. Each controller is one view (one tab): it owns that view's
//! history and displayed page and runs at most one navigation at a time,
//! a newer navigation superseding an older one.

mod controller;
mod locks;
mod options;
mod outcome;
mod state;

pub use controller::NavigationController;
pub use locks::{AuthorityGuard, AuthorityLocks};
pub use options::NavigateOptions;
pub use outcome::{Failure, NavigationOutcome, Notice, Page, PersistedFile};
pub use state::NavState;
