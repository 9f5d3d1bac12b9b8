//! Per-key async locks.
//!
//! Serializes extractions of the same (application, file) pair inside one
//! process so the completed-files check and the insert that follows cannot
//! interleave. Entries are dropped once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (String, String);

#[derive(Default)]
pub struct KeyedLocks {
    entries: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one extraction.
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: Key,
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, application_name: &str, file_name: &str) -> KeyGuard<'_> {
        let key = (application_name.to_string(), file_name.to_string());
        let mutex = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry(key.clone()).or_default().clone()
        };

        KeyGuard {
            locks: self,
            key,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Keys currently held or waited on.
    pub fn active(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut entries = self.locks.entries.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map and one in this guard means no waiters.
        if entries
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) <= 2)
        {
            entries.remove(&self.key);
        }
    }
}
