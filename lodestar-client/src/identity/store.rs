//! Durable identity records with URL-prefix matching
//!
//! Records are kept in `identities.json` in creation order; certificate and
//! key files live in `certificates/{id}.pem` and `certificates/{id}.key`.
//! Every mutation rewrites the whole record file before returning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use lodestar_common::validators::{
    IdentityNameError, UrlPrefixError, validate_identity_name, validate_url_prefix,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credentials::CredentialProvider;
use super::types::{GeneratedIdentity, Identity};
use crate::constants::{CERT_EXTENSION, CERTIFICATES_DIR_NAME, IDENTITIES_FILE_NAME, KEY_EXTENSION};
use crate::storage::{self, LoadOutcome, StorageError};

/// Current identities file format version
const FILE_VERSION: u32 = 1;

/// Persistent identities file structure
#[derive(Debug, Default, Serialize, Deserialize)]
struct IdentitiesFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    identities: Vec<Identity>,
}

/// Errors from identity store operations
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The display name was rejected
    #[error("invalid identity name: {0}")]
    InvalidName(#[from] IdentityNameError),

    /// The URL prefix was rejected
    #[error("invalid URL prefix: {0}")]
    InvalidPrefix(#[from] UrlPrefixError),

    /// The credential provider failed to generate or inspect a certificate
    #[error("certificate error: {0}")]
    Credential(String),

    /// Certificate or key files could not be written
    #[error("failed to write certificate files: {0}")]
    Files(#[source] StorageError),

    /// The change was applied in memory but the record file was not saved
    #[error("failed to save identities: {source}")]
    Persistence {
        /// Identity the unsaved change applies to
        id: Uuid,
        #[source]
        source: StorageError,
    },
}

impl IdentityError {
    /// Identity whose change was applied in memory despite the error
    ///
    /// Only persistence failures leave a change behind; every other error
    /// means the store is unchanged.
    pub fn applied_to(&self) -> Option<Uuid> {
        match self {
            Self::Persistence { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Identity records plus their certificate files
pub struct IdentityStore {
    /// Path to identities.json
    path: PathBuf,

    /// Directory for certificate and key files
    certs_dir: PathBuf,

    /// Records in creation order
    identities: Vec<Identity>,

    /// Generates and inspects certificates
    provider: Arc<dyn CredentialProvider>,

    /// The file on disk could not be parsed and must be preserved
    corrupt_on_disk: bool,
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("path", &self.path)
            .field("identities", &self.identities.len())
            .field("corrupt_on_disk", &self.corrupt_on_disk)
            .finish()
    }
}

impl IdentityStore {
    /// Load the store from `config_dir`, or start empty
    ///
    /// A missing file starts empty. An unreadable file also starts empty but
    /// is left untouched; it is moved aside to `identities.json.corrupt`
    /// before the first save replaces it.
    pub fn open(config_dir: &Path, provider: Arc<dyn CredentialProvider>) -> Self {
        let path = config_dir.join(IDENTITIES_FILE_NAME);
        let certs_dir = config_dir.join(CERTIFICATES_DIR_NAME);

        let (identities, corrupt_on_disk) = match storage::read_json::<IdentitiesFile>(&path) {
            LoadOutcome::Loaded(file) => (file.identities, false),
            LoadOutcome::Missing => (Vec::new(), false),
            LoadOutcome::Corrupt(reason) => {
                log::warn!(
                    "Identity file {} is unreadable, starting empty: {reason}",
                    path.display()
                );
                (Vec::new(), true)
            }
        };

        log::debug!("Loaded {} identities", identities.len());

        Self {
            path,
            certs_dir,
            identities,
            provider,
            corrupt_on_disk,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Generate a new identity for `host` and persist it
    ///
    /// Files are written before the record is added; if generation or file
    /// writing fails the store is unchanged and no files are left behind.
    pub fn create(
        &mut self,
        name: &str,
        host: &str,
        key_size: u32,
        valid_days: u32,
    ) -> Result<Identity, IdentityError> {
        validate_identity_name(name)?;

        let id = Uuid::new_v4();
        let cert_path = self.cert_path(id);
        let key_path = self.key_path(id);

        let fingerprint = self.write_material(&cert_path, &key_path, host, key_size, valid_days)?;

        let created_at = Utc::now();
        let identity = Identity {
            id,
            name: name.trim().to_string(),
            fingerprint,
            cert_path,
            key_path,
            url_prefixes: Vec::new(),
            created_at,
            expires_at: expiry(created_at, valid_days),
        };

        log::info!("Created identity {} ({})", identity.name, identity.id);
        self.identities.push(identity.clone());
        self.persist(id)?;
        Ok(identity)
    }

    /// Delete an identity and its files
    ///
    /// Returns `false` if the id is unknown. Missing files are tolerated.
    pub fn remove(&mut self, id: Uuid) -> Result<bool, IdentityError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let identity = self.identities.remove(index);
        for path in [&identity.cert_path, &identity.key_path] {
            if let Err(e) = storage::remove_if_exists(path) {
                log::warn!("Failed to delete {}: {e}", path.display());
            }
        }

        log::info!("Removed identity {} ({})", identity.name, identity.id);
        self.persist(id)?;
        Ok(true)
    }

    /// Replace the certificate and key of an existing identity
    ///
    /// Keeps the id, name, prefixes and file paths; updates fingerprint and
    /// expiry. Returns `false` if the id is unknown.
    pub fn regenerate(
        &mut self,
        id: Uuid,
        host: &str,
        key_size: u32,
        valid_days: u32,
    ) -> Result<bool, IdentityError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let cert_path = self.identities[index].cert_path.clone();
        let key_path = self.identities[index].key_path.clone();
        let fingerprint = self.write_material(&cert_path, &key_path, host, key_size, valid_days)?;

        let identity = &mut self.identities[index];
        identity.fingerprint = fingerprint;
        identity.expires_at = expiry(Utc::now(), valid_days);
        log::info!("Regenerated certificate for identity {}", identity.id);

        self.persist(id)?;
        Ok(true)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Change an identity's display name
    pub fn rename(&mut self, id: Uuid, name: &str) -> Result<bool, IdentityError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        validate_identity_name(name)?;

        self.identities[index].name = name.trim().to_string();
        self.persist(id)?;
        Ok(true)
    }

    /// Bind `prefix` to an identity
    ///
    /// Adding a prefix the identity already has succeeds without rewriting
    /// the file.
    pub fn add_prefix(&mut self, id: Uuid, prefix: &str) -> Result<bool, IdentityError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        validate_url_prefix(prefix)?;

        let prefixes = &mut self.identities[index].url_prefixes;
        if prefixes.iter().any(|existing| existing == prefix) {
            return Ok(true);
        }

        prefixes.push(prefix.to_string());
        log::debug!("Bound {prefix} to identity {id}");
        self.persist(id)?;
        Ok(true)
    }

    /// Unbind `prefix` from an identity
    ///
    /// Returns `false` if the id or the prefix is unknown.
    pub fn remove_prefix(&mut self, id: Uuid, prefix: &str) -> Result<bool, IdentityError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let prefixes = &mut self.identities[index].url_prefixes;
        let Some(prefix_index) = prefixes.iter().position(|existing| existing == prefix) else {
            return Ok(false);
        };

        prefixes.remove(prefix_index);
        self.persist(id)?;
        Ok(true)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get an identity by id
    pub fn get(&self, id: Uuid) -> Option<&Identity> {
        self.identities.iter().find(|identity| identity.id == id)
    }

    /// All identities in creation order
    pub fn all(&self) -> &[Identity] {
        &self.identities
    }

    /// Number of identities
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// True if the store holds no identities
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// True if the identity exists and its certificate is usable
    ///
    /// The certificate file must exist, the provider must not report it
    /// expired, and the recorded expiry (if any) must be in the future.
    pub fn is_valid(&self, id: Uuid) -> bool {
        let Some(identity) = self.get(id) else {
            return false;
        };

        identity.cert_path.exists()
            && !self.provider.is_expired(&identity.cert_path)
            && !identity.is_expired_at(Utc::now())
    }

    /// Identity with the longest prefix matching `url`
    ///
    /// Ties go to the identity created first.
    pub fn best_match(&self, url: &str) -> Option<&Identity> {
        let mut best: Option<(&Identity, usize)> = None;

        for identity in &self.identities {
            if let Some(length) = identity.longest_match(url)
                && best.is_none_or(|(_, best_length)| length > best_length)
            {
                best = Some((identity, length));
            }
        }

        best.map(|(identity, _)| identity)
    }

    /// Every identity with a prefix matching `url`, longest match first
    ///
    /// Each identity appears once, ranked by its longest matching prefix;
    /// equal ranks keep creation order.
    pub fn all_matches(&self, url: &str) -> Vec<&Identity> {
        let mut matches: Vec<(&Identity, usize)> = self
            .identities
            .iter()
            .filter_map(|identity| identity.longest_match(url).map(|length| (identity, length)))
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1));
        matches.into_iter().map(|(identity, _)| identity).collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position(&self, id: Uuid) -> Option<usize> {
        self.identities.iter().position(|identity| identity.id == id)
    }

    fn cert_path(&self, id: Uuid) -> PathBuf {
        self.certs_dir.join(format!("{id}.{CERT_EXTENSION}"))
    }

    fn key_path(&self, id: Uuid) -> PathBuf {
        self.certs_dir.join(format!("{id}.{KEY_EXTENSION}"))
    }

    /// Generate key material, install both files and return the fingerprint
    ///
    /// Both files are written and fingerprinted at their `.tmp` siblings and
    /// only renamed into place once that has succeeded. On error the staged
    /// files are removed and existing files are left as they were.
    fn write_material(
        &self,
        cert_path: &Path,
        key_path: &Path,
        host: &str,
        key_size: u32,
        valid_days: u32,
    ) -> Result<String, IdentityError> {
        let generated = self
            .provider
            .generate_identity(host, key_size, valid_days)
            .map_err(IdentityError::Credential)?;

        let cert_tmp = storage::tmp_path(cert_path);
        let key_tmp = storage::tmp_path(key_path);

        let result = self
            .stage_material(&generated, &cert_tmp, &key_tmp)
            .and_then(|fingerprint| {
                storage::install(&key_tmp, key_path).map_err(IdentityError::Files)?;
                storage::install(&cert_tmp, cert_path).map_err(IdentityError::Files)?;
                Ok(fingerprint)
            });

        if result.is_err() {
            for path in [&cert_tmp, &key_tmp] {
                let _ = storage::remove_if_exists(path);
            }
        }

        result
    }

    fn stage_material(
        &self,
        generated: &GeneratedIdentity,
        cert_tmp: &Path,
        key_tmp: &Path,
    ) -> Result<String, IdentityError> {
        storage::write_private(cert_tmp, &generated.cert_pem).map_err(IdentityError::Files)?;
        storage::write_private(key_tmp, &generated.key_pem).map_err(IdentityError::Files)?;

        self.provider
            .fingerprint(cert_tmp)
            .map_err(IdentityError::Credential)
    }

    /// Rewrite the record file after a change to `id`
    fn persist(&mut self, id: Uuid) -> Result<(), IdentityError> {
        self.save()
            .map_err(|source| IdentityError::Persistence { id, source })
    }

    fn save(&mut self) -> Result<(), StorageError> {
        if self.corrupt_on_disk {
            if let Some(backup) = storage::preserve_corrupt(&self.path)? {
                log::warn!("Moved unreadable identity file to {}", backup.display());
            }
            self.corrupt_on_disk = false;
        }

        let file = IdentitiesFile {
            version: FILE_VERSION,
            identities: self.identities.clone(),
        };
        storage::write_json_atomic(&self.path, &file)
    }
}

fn expiry(from: DateTime<Utc>, valid_days: u32) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(i64::from(valid_days)).and_then(|days| from.checked_add_signed(days))
}
