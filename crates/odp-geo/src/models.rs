//! Geometry models for odp-geo.
//!
//! This module re-exports the document types from `odp-core` and converts
//! feature geometries into `geo` types for containment tests.

use geo::algorithm::bounding_rect::BoundingRect;
use geo::Geometry as GeoGeometry;
use rstar::AABB;

pub use odp_core::models::{
    BoundingBox, Coordinates, Crs, FeatureCollection, FeatureGeometry, GeoFeature, ValidityMode,
};

use odp_core::error::GeometryError;

/// Convert a feature geometry to a `geo` geometry, going through `geojson`
/// so that every GeoJSON geometry type is understood.
pub fn to_geo_geometry(
    geometry: &FeatureGeometry,
    feature_id: &str,
) -> Result<GeoGeometry<f64>, GeometryError> {
    let invalid =
        |reason: String| GeometryError::Invalid { feature_id: feature_id.to_string(), reason };

    let json = serde_json::to_value(geometry).map_err(|e| invalid(e.to_string()))?;
    let parsed: geojson::Geometry =
        serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;

    GeoGeometry::<f64>::try_from(parsed.value).map_err(|e| invalid(e.to_string()))
}

/// Envelope of a geometry for R-tree indexing
pub fn envelope_of(geometry: &GeoGeometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry.bounding_rect().map(|rect| {
        let min = rect.min();
        let max = rect.max();
        AABB::from_corners([min.x, min.y], [max.x, max.y])
    })
}
