//! Fetching resources
//!
//! The navigation core does not speak the wire protocol itself. The
//! embedding application supplies a [`Fetcher`] that opens the TLS
//! connection, presents the client certificate if one is given, sends the
//! request line and returns the parsed response header and body.

mod fetcher;
mod types;

pub use fetcher::Fetcher;
pub use types::{FetchRequest, TransportError};
