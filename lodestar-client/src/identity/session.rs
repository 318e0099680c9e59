//! Per-authority identity choices
//!
//! Remembers, for each authority prefix (`gemini://host[:port]/`), whether
//! the user chose to present a specific identity or to stay anonymous.
//! Stored as a flat JSON object:
//!
//! ```json
//! {
//!   "gemini://example.org/": "anonymous",
//!   "gemini://station.example/": "6f1c0e9a-..."
//! }
//! ```
//!
//! Entries that point at an identity which no longer exists (or whose
//! certificate is no longer valid) are purged on lookup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lodestar_common::url::authority_prefix;
use uuid::Uuid;

use super::store::IdentityStore;
use super::types::Identity;
use crate::storage::{self, LoadOutcome, StorageError};

/// Value stored for an explicit anonymous choice
pub const ANONYMOUS_MARKER: &str = "anonymous";

/// What the session remembers for an authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChoice {
    /// Present this identity
    Identity(Identity),
    /// The user chose not to present any identity
    Anonymous,
    /// Nothing decided yet
    Undecided,
}

/// Stored form of a decided choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stored {
    Identity(Uuid),
    Anonymous,
}

impl Stored {
    fn parse(value: &str) -> Option<Self> {
        if value == ANONYMOUS_MARKER {
            Some(Self::Anonymous)
        } else {
            Uuid::parse_str(value).ok().map(Self::Identity)
        }
    }

    fn to_value(self) -> String {
        match self {
            Self::Identity(id) => id.to_string(),
            Self::Anonymous => ANONYMOUS_MARKER.to_string(),
        }
    }
}

/// Authority prefix to identity choice, persisted
#[derive(Debug)]
pub struct SessionIdentityCache {
    /// Path to session_identities.json
    path: PathBuf,

    /// Decided authorities
    choices: BTreeMap<String, Stored>,

    /// In-memory state differs from the file
    dirty: bool,

    /// The file on disk could not be parsed and must be preserved
    corrupt_on_disk: bool,
}

impl SessionIdentityCache {
    /// Load choices from `path`, or start empty
    ///
    /// A missing or unreadable file starts empty. An unreadable file is left
    /// untouched until the first save moves it aside to
    /// `session_identities.json.corrupt`. Entries whose value is neither the
    /// anonymous marker nor a UUID are skipped.
    pub fn load(path: &Path) -> Self {
        let (raw, corrupt_on_disk) = match storage::read_json::<BTreeMap<String, String>>(path) {
            LoadOutcome::Loaded(raw) => (raw, false),
            LoadOutcome::Missing => (BTreeMap::new(), false),
            LoadOutcome::Corrupt(reason) => {
                log::warn!(
                    "Session identity file {} is unreadable, starting empty: {reason}",
                    path.display()
                );
                (BTreeMap::new(), true)
            }
        };

        let choices = raw
            .into_iter()
            .filter_map(|(prefix, value)| match Stored::parse(&value) {
                Some(stored) => Some((prefix, stored)),
                None => {
                    log::debug!("Skipping session entry {prefix} with value {value:?}");
                    None
                }
            })
            .collect();

        Self {
            path: path.to_path_buf(),
            choices,
            dirty: false,
            corrupt_on_disk,
        }
    }

    /// Write all choices to disk
    pub fn save(&mut self) -> Result<(), StorageError> {
        if self.corrupt_on_disk {
            if let Some(backup) = storage::preserve_corrupt(&self.path)? {
                log::warn!("Moved unreadable session identity file to {}", backup.display());
            }
            self.corrupt_on_disk = false;
        }

        let raw: BTreeMap<&str, String> = self
            .choices
            .iter()
            .map(|(prefix, stored)| (prefix.as_str(), stored.to_value()))
            .collect();

        storage::write_json_atomic(&self.path, &raw)?;
        self.dirty = false;
        Ok(())
    }

    /// Save only if something changed since the last successful save
    pub fn save_if_dirty(&mut self) -> Result<(), StorageError> {
        if self.dirty { self.save() } else { Ok(()) }
    }

    /// True if there are changes not yet written to disk
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The choice for the authority of `url`
    ///
    /// A remembered identity that `store` no longer considers valid is
    /// dropped (and the drop persisted) and reported as `Undecided`.
    pub fn choice_for(&mut self, url: &str, store: &IdentityStore) -> SessionChoice {
        let Ok(prefix) = authority_prefix(url) else {
            return SessionChoice::Undecided;
        };

        match self.choices.get(&prefix).copied() {
            None => SessionChoice::Undecided,
            Some(Stored::Anonymous) => SessionChoice::Anonymous,
            Some(Stored::Identity(id)) => match store.get(id) {
                Some(identity) if store.is_valid(id) => SessionChoice::Identity(identity.clone()),
                _ => {
                    log::info!("Forgetting stale identity {id} for {prefix}");
                    self.choices.remove(&prefix);
                    self.dirty = true;
                    if let Err(e) = self.save() {
                        log::warn!("Failed to save session identities: {e}");
                    }
                    SessionChoice::Undecided
                }
            },
        }
    }

    /// Remember a choice for an authority and persist it
    ///
    /// `None` records an explicit anonymous choice, distinct from having no
    /// entry at all. Prefixes are normalised to their authority form when
    /// they parse as URLs. The choice stays in memory if saving fails.
    pub fn record_choice(&mut self, prefix: &str, identity: Option<Uuid>) -> Result<(), StorageError> {
        let prefix = normalize_prefix(prefix);
        let stored = identity.map_or(Stored::Anonymous, Stored::Identity);

        log::debug!("Session choice for {prefix}: {}", stored.to_value());
        self.choices.insert(prefix, stored);
        self.dirty = true;
        self.save()
    }

    /// Reset an authority to undecided
    ///
    /// Returns `Ok(false)` if nothing was recorded for it.
    pub fn forget(&mut self, prefix: &str) -> Result<bool, StorageError> {
        if self.choices.remove(&normalize_prefix(prefix)).is_none() {
            return Ok(false);
        }

        self.dirty = true;
        self.save()?;
        Ok(true)
    }

    /// Number of decided authorities
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// True if no authority has a recorded choice
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

fn normalize_prefix(prefix: &str) -> String {
    authority_prefix(prefix).unwrap_or_else(|_| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::testing::FakeProvider;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: IdentityStore,
        provider: Arc<FakeProvider>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let provider = Arc::new(FakeProvider::default());
            let store = IdentityStore::open(dir.path(), provider.clone());
            Self {
                dir,
                store,
                provider,
            }
        }

        fn session_path(&self) -> PathBuf {
            self.dir.path().join("session_identities.json")
        }

        fn cache(&self) -> SessionIdentityCache {
            SessionIdentityCache::load(&self.session_path())
        }
    }

    #[test]
    fn test_undecided_by_default() {
        let fx = Fixture::new();
        let mut cache = fx.cache();
        assert!(cache.is_empty());
        assert_eq!(
            cache.choice_for("gemini://a.com/page", &fx.store),
            SessionChoice::Undecided
        );
    }

    #[test]
    fn test_anonymous_distinct_from_undecided() {
        let fx = Fixture::new();
        let mut cache = fx.cache();

        cache.record_choice("gemini://a.com/", None).unwrap();

        assert_eq!(
            cache.choice_for("gemini://a.com/deep/page.gmi", &fx.store),
            SessionChoice::Anonymous
        );
        assert_eq!(
            cache.choice_for("gemini://b.com/", &fx.store),
            SessionChoice::Undecided
        );
    }

    #[test]
    fn test_identity_choice() {
        let mut fx = Fixture::new();
        let identity = fx.store.create("Personal", "a.com", 2048, 365).unwrap();
        let mut cache = fx.cache();

        cache
            .record_choice("gemini://a.com/", Some(identity.id))
            .unwrap();

        assert_eq!(
            cache.choice_for("gemini://a.com/x", &fx.store),
            SessionChoice::Identity(identity)
        );
    }

    #[test]
    fn test_keyed_by_authority() {
        let mut fx = Fixture::new();
        let identity = fx.store.create("Personal", "a.com", 2048, 365).unwrap();
        let mut cache = fx.cache();

        cache
            .record_choice("gemini://A.com:1965/some/path", Some(identity.id))
            .unwrap();

        assert!(matches!(
            cache.choice_for("gemini://a.com/other", &fx.store),
            SessionChoice::Identity(_)
        ));
        assert_eq!(
            cache.choice_for("gemini://a.com:1966/", &fx.store),
            SessionChoice::Undecided
        );
    }

    #[test]
    fn test_removed_identity_is_purged() {
        let mut fx = Fixture::new();
        let identity = fx.store.create("Personal", "a.com", 2048, 365).unwrap();
        let mut cache = fx.cache();
        cache
            .record_choice("gemini://a.com/", Some(identity.id))
            .unwrap();

        fx.store.remove(identity.id).unwrap();

        assert_eq!(
            cache.choice_for("gemini://a.com/", &fx.store),
            SessionChoice::Undecided
        );
        assert!(cache.is_empty());

        // Purge was persisted
        let reloaded = fx.cache();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_expired_identity_is_purged() {
        let mut fx = Fixture::new();
        let identity = fx.store.create("Personal", "a.com", 2048, 365).unwrap();
        let mut cache = fx.cache();
        cache
            .record_choice("gemini://a.com/", Some(identity.id))
            .unwrap();

        fx.provider.mark_expired(&identity.cert_path);

        assert_eq!(
            cache.choice_for("gemini://a.com/", &fx.store),
            SessionChoice::Undecided
        );
    }

    #[test]
    fn test_forget() {
        let fx = Fixture::new();
        let mut cache = fx.cache();
        cache.record_choice("gemini://a.com/", None).unwrap();

        assert!(cache.forget("gemini://a.com/").unwrap());
        assert!(!cache.forget("gemini://a.com/").unwrap());
        assert_eq!(
            cache.choice_for("gemini://a.com/", &fx.store),
            SessionChoice::Undecided
        );
    }

    #[test]
    fn test_persisted_format() {
        let mut fx = Fixture::new();
        let identity = fx.store.create("Personal", "a.com", 2048, 365).unwrap();
        let mut cache = fx.cache();
        cache.record_choice("gemini://a.com/", None).unwrap();
        cache
            .record_choice("gemini://b.com/", Some(identity.id))
            .unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(fx.session_path()).unwrap()).unwrap();
        assert_eq!(raw["gemini://a.com/"], "anonymous");
        assert_eq!(raw["gemini://b.com/"], identity.id.to_string());

        let mut reloaded = fx.cache();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.choice_for("gemini://a.com/", &fx.store),
            SessionChoice::Anonymous
        );
    }

    #[test]
    fn test_load_skips_bad_values() {
        let fx = Fixture::new();
        fs::write(
            fx.session_path(),
            r#"{"gemini://a.com/": "anonymous", "gemini://b.com/": "not-a-uuid"}"#,
        )
        .unwrap();

        let cache = fx.cache();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_load_corrupt_starts_empty() {
        let fx = Fixture::new();
        fs::write(fx.session_path(), "[1, 2").unwrap();

        let cache = fx.cache();
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_corrupt_file_preserved() {
        let fx = Fixture::new();
        fs::write(fx.session_path(), "{corrupt").unwrap();

        let mut cache = fx.cache();
        assert_eq!(fs::read_to_string(fx.session_path()).unwrap(), "{corrupt");

        cache.record_choice("gemini://a.com/", None).unwrap();

        let backup = fx.dir.path().join("session_identities.json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{corrupt");
        let mut reloaded = fx.cache();
        assert_eq!(
            reloaded.choice_for("gemini://a.com/", &fx.store),
            SessionChoice::Anonymous
        );
    }

    #[test]
    fn test_failed_save_keeps_choice() {
        let fx = Fixture::new();
        fs::create_dir(fx.session_path()).unwrap();
        let mut cache = fx.cache();

        assert!(cache.record_choice("gemini://a.com/", None).is_err());
        assert!(cache.is_dirty());
        assert_eq!(
            cache.choice_for("gemini://a.com/", &fx.store),
            SessionChoice::Anonymous
        );
    }
}
