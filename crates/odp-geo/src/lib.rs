//! ODP Geo - Reprojection, geometry repair, and spatial lookup
//!
//! This crate handles all geospatial operations of the pipeline: CRS
//! transformations, multi-polygon repair, bounding boxes, and point-in-polygon
//! lookups backed by a persistent cache.

pub mod models;
pub mod repair;
pub mod spatial;
pub mod transform;

pub use repair::{add_bounding_boxes, bounding_box, repair_feature, repair_geometry};
pub use spatial::{cache_key, resolve_spatial_id, SpatialFeatureCache, SpatialLookup};
pub use transform::{reproject, reproject_collection, Reprojector};
