//! Application-wide constants
//!
//! File names and defaults shared across modules.

/// Application directory name (used in config directory path)
pub const APP_DIR_NAME: &str = "lodestar";

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Identity records file name
pub const IDENTITIES_FILE_NAME: &str = "identities.json";

/// Directory holding identity certificate and key files
pub const CERTIFICATES_DIR_NAME: &str = "certificates";

/// Session identity choices file name
pub const SESSION_FILE_NAME: &str = "session_identities.json";

/// Certificate file extension
pub const CERT_EXTENSION: &str = "pem";

/// Private key file extension
pub const KEY_EXTENSION: &str = "key";

/// Suffix for the temporary file written before an atomic rename
pub const TMP_SUFFIX: &str = "tmp";

/// Suffix for a corrupt file moved aside before it is replaced
pub const CORRUPT_SUFFIX: &str = "corrupt";

// =============================================================================
// Settings defaults
// =============================================================================

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of redirects followed per navigation
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Default history bound
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default RSA key size for generated identities
pub const DEFAULT_KEY_SIZE: u32 = 2048;

/// Smallest key size accepted from the settings file
pub const MIN_KEY_SIZE: u32 = 2048;

/// Default certificate lifetime in days
pub const DEFAULT_VALID_DAYS: u32 = 365;
