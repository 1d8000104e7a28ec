//! ODP Engine - Declarative column and property transforms
//!
//! This crate applies a parsed table spec to an in-memory dataset in a fixed
//! order of stages, and property transforms to GeoJSON features.

pub mod aggregate;
pub mod clean;
pub mod filter;
pub mod format;
pub mod pipeline;
pub mod properties;

pub use aggregate::aggregate;
pub use filter::apply_filters;
pub use pipeline::{transform, SpatialContext, TransformContext};
pub use properties::{apply_properties, apply_property};
