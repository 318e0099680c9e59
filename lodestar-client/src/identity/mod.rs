//! Client identities
//!
//! An identity is a client certificate the user presents to servers that
//! ask for one (status 60). The [`IdentityStore`] owns the durable records
//! and answers "which identities are bound to this URL"; the
//! [`SessionIdentityCache`] remembers, per authority, what the user decided
//! to present.

mod credentials;
mod session;
mod store;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use credentials::CredentialProvider;
pub use session::{ANONYMOUS_MARKER, SessionChoice, SessionIdentityCache};
pub use store::{IdentityError, IdentityStore};
pub use types::{GeneratedIdentity, Identity, IdentityMaterial};
