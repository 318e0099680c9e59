//! Configuration management
//!
//! Everything the navigation core persists lives in one directory
//! (`~/.config/lodestar` on Linux):
//!
//! - `settings.json` - user preferences ([`Settings`])
//! - `identities.json` - identity records
//! - `certificates/` - identity certificate and key files
//! - `session_identities.json` - per-authority identity choices

mod settings;

use std::path::{Path, PathBuf};

pub use settings::{IdentityPrompt, Settings};

use crate::constants::{
    APP_DIR_NAME, CERTIFICATES_DIR_NAME, IDENTITIES_FILE_NAME, SESSION_FILE_NAME,
    SETTINGS_FILE_NAME,
};
use crate::storage::{self, LoadOutcome, StorageError};

/// Loaded settings plus the directory they came from
#[derive(Debug, Clone)]
pub struct Config {
    /// User preferences
    pub settings: Settings,

    /// Directory holding all persisted state
    dir: PathBuf,
}

impl Config {
    /// Platform-specific config directory (`dirs::config_dir()/lodestar`)
    ///
    /// Returns None if the config directory cannot be determined.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Load settings from the platform config directory
    ///
    /// Falls back to the current directory when the platform has no config
    /// directory.
    pub fn load() -> Self {
        let dir = Self::default_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::load_from(&dir)
    }

    /// Load settings from `dir`, or defaults if not found
    ///
    /// Returns default settings if:
    /// - The settings file doesn't exist
    /// - The settings file cannot be read
    /// - The settings file contains invalid JSON
    ///
    /// Out-of-range values are replaced by defaults.
    pub fn load_from(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE_NAME);
        let settings = match storage::read_json::<Settings>(&path) {
            LoadOutcome::Loaded(settings) => settings.sanitized(),
            LoadOutcome::Missing => Settings::default(),
            LoadOutcome::Corrupt(reason) => {
                log::warn!("Ignoring unreadable settings {}: {reason}", path.display());
                Settings::default()
            }
        };

        Self {
            settings,
            dir: dir.to_path_buf(),
        }
    }

    /// Save settings atomically with owner-only permissions
    pub fn save(&self) -> Result<(), StorageError> {
        storage::write_json_atomic(&self.settings_path(), &self.settings)
    }

    /// Directory holding all persisted state
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the settings file
    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE_NAME)
    }

    /// Path of the identity records file
    pub fn identities_path(&self) -> PathBuf {
        self.dir.join(IDENTITIES_FILE_NAME)
    }

    /// Directory holding certificate and key files
    pub fn certificates_dir(&self) -> PathBuf {
        self.dir.join(CERTIFICATES_DIR_NAME)
    }

    /// Path of the session identity choices file
    pub fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE_NAME)
    }
}
