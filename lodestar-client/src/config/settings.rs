//! User preference settings

use std::time::Duration;

use crate::constants::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_KEY_SIZE, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_VALID_DAYS, MIN_KEY_SIZE,
};

// =============================================================================
// Identity Prompt Policy
// =============================================================================

/// When the navigation core asks the user which identity to present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPrompt {
    /// Ask on every request that has at least one matching identity
    EveryTime,

    /// Ask only when several identities match and no choice is cached
    #[default]
    WhenAmbiguous,

    /// Never ask; use the cached choice or the best prefix match
    RememberChoice,
}

// =============================================================================
// Settings
// =============================================================================

/// User preferences for the navigation core
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    /// Request timeout in seconds (must be positive)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Redirects followed per navigation (0 disables following)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Identity prompting policy
    #[serde(default)]
    pub identity_prompt: IdentityPrompt,

    /// Maximum number of history entries kept per view
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// RSA key size for newly generated identities
    #[serde(default = "default_key_size")]
    pub key_size: u32,

    /// Lifetime of newly generated identity certificates in days
    #[serde(default = "default_valid_days")]
    pub valid_days: u32,

    /// Page opened by `go_home`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_page: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            identity_prompt: IdentityPrompt::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            key_size: DEFAULT_KEY_SIZE,
            valid_days: DEFAULT_VALID_DAYS,
            home_page: None,
        }
    }
}

impl Settings {
    /// Replace out-of-range values with their defaults
    ///
    /// A zero timeout, zero history limit, undersized key or zero validity
    /// is logged and reset; a blank home page becomes None.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.timeout_secs == 0 {
            log::warn!("timeout_secs must be positive, using {DEFAULT_TIMEOUT_SECS}");
            self.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.history_limit == 0 {
            log::warn!("history_limit must be at least 1, using {DEFAULT_HISTORY_LIMIT}");
            self.history_limit = DEFAULT_HISTORY_LIMIT;
        }
        if self.key_size < MIN_KEY_SIZE {
            log::warn!("key_size {} is too small, using {DEFAULT_KEY_SIZE}", self.key_size);
            self.key_size = DEFAULT_KEY_SIZE;
        }
        if self.valid_days == 0 {
            self.valid_days = DEFAULT_VALID_DAYS;
        }
        self.home_page = self
            .home_page
            .map(|page| page.trim().to_string())
            .filter(|page| !page.is_empty());
        self
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_redirects() -> u32 {
    DEFAULT_MAX_REDIRECTS
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_key_size() -> u32 {
    DEFAULT_KEY_SIZE
}

fn default_valid_days() -> u32 {
    DEFAULT_VALID_DAYS
}

// =============================================================================
// Tests
// =============================================================================
