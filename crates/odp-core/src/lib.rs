//! ODP Core - Data model, error taxonomy, and configuration
//!
//! This crate contains the shared domain types and port definitions for the
//! open data product transformation pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{OdpError, Result};
