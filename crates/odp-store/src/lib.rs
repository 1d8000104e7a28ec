//! ODP Store - Cache persistence adapters
//!
//! This crate provides the adapters behind the spatial feature cache port:
//! an in-memory store for tests and a CSV file store for real runs.

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvCacheStore;
pub use memory::MemoryCacheStore;
