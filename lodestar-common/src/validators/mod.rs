//! Input validation functions
//!
//! Reusable validators for values that cross the boundary between the user,
//! the navigation core and the network. The core uses them for enforcement;
//! front ends can use them for pre-validation (e.g. to show a live byte
//! counter on an input prompt).

mod identity_name;
mod request_url;
mod url_prefix;

pub use identity_name::{IdentityNameError, MAX_IDENTITY_NAME_LENGTH, validate_identity_name};
pub use request_url::{
    MAX_REQUEST_URL_LENGTH, RequestUrlError, remaining_query_bytes, validate_request_url,
};
pub use url_prefix::{MAX_URL_PREFIX_LENGTH, UrlPrefixError, validate_url_prefix};
