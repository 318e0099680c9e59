//! Identity record types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client certificate plus the metadata used to pick it for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier (also the certificate file stem)
    pub id: Uuid,

    /// Display name shown in selection prompts
    pub name: String,

    /// SHA-256 fingerprint of the certificate
    pub fingerprint: String,

    /// Certificate file (PEM)
    pub cert_path: PathBuf,

    /// Private key file (PEM, owner read/write only)
    pub key_path: PathBuf,

    /// URL prefixes this identity is presented for, in insertion order
    #[serde(default)]
    pub url_prefixes: Vec<String>,

    /// When the identity was created
    pub created_at: DateTime<Utc>,

    /// When the certificate stops being valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Length of the longest bound prefix that `url` starts with
    ///
    /// Matching is a literal string prefix test, so `gemini://a.com/x`
    /// does not match `gemini://a.com/xy/` but does match `gemini://a.com/x`.
    pub fn longest_match(&self, url: &str) -> Option<usize> {
        self.url_prefixes
            .iter()
            .filter(|prefix| url.starts_with(prefix.as_str()))
            .map(String::len)
            .max()
    }

    /// True if the recorded expiry is at or before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    /// Material a fetcher needs to present this identity
    pub fn material(&self) -> IdentityMaterial {
        IdentityMaterial {
            id: self.id,
            cert_path: self.cert_path.clone(),
            key_path: self.key_path.clone(),
        }
    }
}

/// Certificate and key locations handed to the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMaterial {
    /// Identity the material belongs to
    pub id: Uuid,
    /// Certificate file (PEM)
    pub cert_path: PathBuf,
    /// Private key file (PEM)
    pub key_path: PathBuf,
}

/// Freshly generated certificate and key
#[derive(Clone)]
pub struct GeneratedIdentity {
    /// Certificate (PEM)
    pub cert_pem: Vec<u8>,
    /// Private key (PEM)
    pub key_pem: Vec<u8>,
}

// Manual Debug implementation to keep key material out of logs
impl std::fmt::Debug for GeneratedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedIdentity")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity_with(prefixes: &[&str]) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            fingerprint: String::new(),
            cert_path: PathBuf::from("/certs/a.pem"),
            key_path: PathBuf::from("/certs/a.key"),
            url_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn test_longest_match() {
        let identity = identity_with(&["gemini://a.com/", "gemini://a.com/x/"]);
        assert_eq!(
            identity.longest_match("gemini://a.com/x/y"),
            Some("gemini://a.com/x/".len())
        );
        assert_eq!(
            identity.longest_match("gemini://a.com/z"),
            Some("gemini://a.com/".len())
        );
        assert_eq!(identity.longest_match("gemini://b.com/"), None);
    }

    #[test]
    fn test_match_is_literal_prefix() {
        let identity = identity_with(&["gemini://a.com"]);
        // Not hostname semantics: a.com is a string prefix of a.company
        assert!(identity.longest_match("gemini://a.company/").is_some());

        let identity = identity_with(&["gemini://a.com/"]);
        assert!(identity.longest_match("gemini://A.COM/").is_none());
    }

    #[test]
    fn test_expiry() {
        let mut identity = identity_with(&[]);
        let now = Utc::now();
        assert!(!identity.is_expired_at(now));

        identity.expires_at = Some(now - Duration::days(1));
        assert!(identity.is_expired_at(now));

        identity.expires_at = Some(now + Duration::days(1));
        assert!(!identity.is_expired_at(now));
    }

    #[test]
    fn test_generated_identity_debug_redacts_key() {
        let generated = GeneratedIdentity {
            cert_pem: b"CERT".to_vec(),
            key_pem: b"SECRET KEY".to_vec(),
        };
        let debug = format!("{generated:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("SECRET"));
    }
}
