//! Fetcher collaborator

use lodestar_common::protocol::Response;

use super::types::{FetchRequest, TransportError};

/// Performs a single request against a server
///
/// Implementations own connection handling, TLS (including server
/// certificate trust), the timeout and any redirects they choose to follow
/// within `max_redirects`. A redirect they stop at is returned as a 3x
/// response with `redirect_url` set.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `request.url`, presenting `request.identity` if set
    async fn fetch(&self, request: FetchRequest) -> Result<Response, TransportError>;
}
