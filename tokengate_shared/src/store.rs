//! Thread-safe string-to-string map shared by all request handlers.
//!
//! Readers proceed in parallel; a writer excludes every other reader and
//! writer on the same instance. Locks are only ever held for the in-memory
//! map operation itself, never across I/O or an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct ConcurrentStore {
    map: RwLock<HashMap<String, String>>,
}

impl ConcurrentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: BTreeMap<String, String>) -> Self {
        Self {
            map: RwLock::new(snapshot.into_iter().collect()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    /// Inserts or overwrites `key`. Last writer wins.
    pub fn put(&self, key: &str, value: &str) {
        self.write().insert(key.to_string(), value.to_string());
    }

    /// Inserts `key` only if it is absent. Returns `false` and leaves the
    /// existing value untouched when the key is already present.
    pub fn put_if_absent(&self, key: &str, value: &str) -> bool {
        let mut map = self.write();
        if map.contains_key(key) {
            return false;
        }
        map.insert(key.to_string(), value.to_string());
        true
    }

    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Point-in-time copy of every entry, taken under a single read lock.
    /// Sorted so that repeated saves of the same content encode identically.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // The map only ever holds owned strings and every mutation is a single
    // insert/remove, so a panicking holder cannot leave it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}
