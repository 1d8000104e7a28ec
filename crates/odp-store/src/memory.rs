//! Feature cache held in a map, lost when the run ends.
//!
//! Used where the point-to-feature cache only has to live for one lookup
//! session, such as the engine tests. A poisoned lock panics: it only happens
//! after another lookup thread already panicked.

use odp_core::error::CacheError;
use odp_core::ports::{CacheEntry, FeatureCacheStore};
use std::sync::{Arc, RwLock};

/// In-memory implementation of FeatureCacheStore.
///
/// Clones share the same entries, so a test can keep a handle and inspect
/// what the cache persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<Vec<CacheEntry>>>,
}

impl MemoryCacheStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that starts with the given entries
    pub fn with_entries(entries: Vec<CacheEntry>) -> Self {
        Self { entries: Arc::new(RwLock::new(entries)) }
    }

    /// Snapshot of everything persisted so far
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().unwrap().clone()
    }
}

impl FeatureCacheStore for MemoryCacheStore {
    fn load(&self) -> Result<Vec<CacheEntry>, CacheError> {
        Ok(self.entries.read().unwrap().clone())
    }

    fn append(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries.write().unwrap().push(entry.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
