//! Certificate generation and inspection collaborator

use std::path::Path;

use super::types::GeneratedIdentity;

/// Creates and inspects client certificates
///
/// The navigation core never touches X.509 itself; the embedding
/// application supplies an implementation backed by its TLS stack.
pub trait CredentialProvider: Send + Sync {
    /// Generate a self-signed certificate and private key for `host`
    fn generate_identity(
        &self,
        host: &str,
        key_size: u32,
        valid_days: u32,
    ) -> Result<GeneratedIdentity, String>;

    /// SHA-256 fingerprint of the certificate at `cert_path`
    fn fingerprint(&self, cert_path: &Path) -> Result<String, String>;

    /// True if the certificate at `cert_path` is expired or unreadable
    fn is_expired(&self, cert_path: &Path) -> bool;
}
