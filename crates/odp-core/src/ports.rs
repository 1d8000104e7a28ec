//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod cache;

pub use cache::{CacheEntry, FeatureCacheStore};
