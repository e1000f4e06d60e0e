//! Per-key reader/writer locks
//!
//! One lock per configuration unit (e.g. a chart), created on first use and
//! kept for the life of the registry. Different keys never block each
//! other; the same key follows reader/writer rules.
//!
//! Locking returns an owned guard; unlocking is dropping it, which also
//! happens on every early return and on panic.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard};

/// Exclusive hold on one key
pub type KeyWriteGuard = OwnedRwLockWriteGuard<()>;

/// Shared hold on one key
pub type KeyReadGuard = OwnedRwLockReadGuard<()>;

type KeyLock = tokio::sync::RwLock<()>;

/// Lazily populated table of per-key locks
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: RwLock<HashMap<String, Arc<KeyLock>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock for `key`, created if absent
    ///
    /// Looks up under the shared table lock first and only takes the
    /// exclusive table lock to insert, so two callers never create two
    /// locks for the same key.
    fn entry(&self, key: &str) -> Arc<KeyLock> {
        {
            let locks = self.locks.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(lock) = locks.get(key) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Take `key` exclusively, waiting for readers and writers to leave
    pub async fn lock(&self, key: &str) -> KeyWriteGuard {
        self.entry(key).write_owned().await
    }

    /// Take `key` shared, waiting for a writer to leave
    pub async fn read(&self, key: &str) -> KeyReadGuard {
        self.entry(key).read_owned().await
    }

    /// Take `key` exclusively if nobody holds it
    pub fn try_lock(&self, key: &str) -> Option<KeyWriteGuard> {
        self.entry(key).try_write_owned().ok()
    }

    /// Release an exclusive hold
    pub fn unlock(guard: KeyWriteGuard) {
        drop(guard);
    }

    /// Release a shared hold
    pub fn runlock(guard: KeyReadGuard) {
        drop(guard);
    }

    /// Number of keys seen so far
    pub fn len(&self) -> usize {
        self.locks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
