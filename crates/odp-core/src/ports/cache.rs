use crate::error::CacheError;
use serde::{Deserialize, Serialize};

/// One resolved point: truncated coordinate key and the containing feature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub feature_id: String,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, feature_id: impl Into<String>) -> Self {
        Self { key: key.into(), feature_id: feature_id.into() }
    }
}

/// Port for persisting spatial lookup results across runs
pub trait FeatureCacheStore {
    /// Load every persisted entry, in insertion order
    fn load(&self) -> Result<Vec<CacheEntry>, CacheError>;

    /// Persist a single new entry. Must be durable when this returns.
    fn append(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Human-readable location of the backend, for logs
    fn describe(&self) -> String;
}
