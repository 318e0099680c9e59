//! Locking helpers
//!
//! Identity resolution for one authority (including any prompt it shows)
//! must not interleave with another resolution for the same authority,
//! even across views. Different authorities proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type AuthorityMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Async locks keyed by authority prefix
///
/// Cloning shares the same set of locks.
#[derive(Debug, Clone, Default)]
pub struct AuthorityLocks {
    locks: Arc<Mutex<AuthorityMap>>,
}

/// Held while resolving the identity for one authority
///
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct AuthorityGuard {
    _guard: OwnedMutexGuard<()>,
}

impl AuthorityLocks {
    /// Create an empty lock set
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `authority`
    pub async fn acquire(&self, authority: &str) -> AuthorityGuard {
        let lock = {
            let mut locks = lock_unpoisoned(&self.locks);
            // Entries only referenced by the map are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(authority.to_string()).or_default().clone()
        };

        AuthorityGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of authorities currently held or waited on
    #[cfg(test)]
    fn active(&self) -> usize {
        lock_unpoisoned(&self.locks)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

/// Lock a std mutex, recovering the data if a previous holder panicked
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
