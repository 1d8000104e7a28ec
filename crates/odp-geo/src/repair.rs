//! Geometry repair and bounding boxes.

use crate::models::{BoundingBox, Coordinates, FeatureCollection, GeoFeature, ValidityMode};
use odp_core::error::GeometryError;
use odp_core::models::BOUNDING_BOX_PROPERTY;
use serde_json::Value as JsonValue;

/// Deepest coordinate nesting a valid geometry can have (MultiPolygon)
pub const MAX_COORDINATE_DEPTH: usize = 4;

/// Reduce a multi-polygon to its largest member and check nesting depth.
///
/// The polygon whose exterior ring has the most vertices is kept; among equal
/// counts the first one wins. Returns whether the feature changed.
pub fn repair_feature(feature: &mut GeoFeature, mode: ValidityMode) -> Result<bool, GeometryError> {
    let label = feature.label();
    let Some(geometry) = feature.geometry.as_mut() else {
        return Ok(false);
    };

    let mut changed = false;

    if let Coordinates::Nested(polygons) = &mut geometry.coordinates {
        if polygons.len() > 1 && polygons.iter().all(|p| p.depth() == 3) {
            let mut best = 0;
            for (i, polygon) in polygons.iter().enumerate() {
                if exterior_vertex_count(polygon) > exterior_vertex_count(&polygons[best]) {
                    best = i;
                }
            }
            let kept = polygons.swap_remove(best);
            tracing::debug!(
                "Feature {}: kept polygon {} with {} vertices, dropped {}",
                label,
                best,
                exterior_vertex_count(&kept),
                polygons.len()
            );
            *polygons = vec![kept];
            changed = true;
        }
    }

    let depth = geometry.coordinates.depth();
    if depth > MAX_COORDINATE_DEPTH {
        match mode {
            ValidityMode::Strict => {
                return Err(GeometryError::NestingTooDeep {
                    feature_id: label,
                    depth,
                    max: MAX_COORDINATE_DEPTH,
                });
            }
            ValidityMode::Lenient => {
                tracing::warn!(
                    "Feature {} has coordinate depth {} (max {}), passing through",
                    label,
                    depth,
                    MAX_COORDINATE_DEPTH
                );
            }
        }
    }

    Ok(changed)
}

fn exterior_vertex_count(polygon: &Coordinates) -> usize {
    polygon.children().first().map_or(0, |ring| ring.children().len())
}

/// Repair every feature of a collection
pub fn repair_geometry(
    mut collection: FeatureCollection,
    mode: ValidityMode,
) -> Result<(FeatureCollection, bool), GeometryError> {
    let mut changed = false;
    for feature in &mut collection.features {
        changed |= repair_feature(feature, mode)?;
    }
    Ok((collection, changed))
}

/// Bounding box over every position, `None` when there is no finite position
pub fn bounding_box(coordinates: &Coordinates) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for position in coordinates.positions() {
        let (x, y) = match position {
            [x, y, ..] if x.is_finite() && y.is_finite() => (*x, *y),
            _ => continue,
        };
        bbox = Some(match bbox {
            None => BoundingBox { min_x: x, min_y: y, max_x: x, max_y: y },
            Some(b) => BoundingBox {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        });
    }

    bbox
}

fn store_bounding_box(feature: &mut GeoFeature, bbox: BoundingBox) {
    let values = bbox.to_array().to_vec();
    feature.properties.insert(
        BOUNDING_BOX_PROPERTY.to_string(),
        JsonValue::Array(values.iter().copied().map(JsonValue::from).collect()),
    );
    feature.bbox = Some(values);
}

/// Recompute the bounding box of a feature that already carries one
pub(crate) fn refresh_bounding_box(feature: &mut GeoFeature) {
    if feature.stored_bounding_box().is_none() && feature.bbox.is_none() {
        return;
    }
    if let Some(bbox) = feature.geometry.as_ref().and_then(|g| bounding_box(&g.coordinates)) {
        store_bounding_box(feature, bbox);
    }
}

/// Store `[xmin, ymin, xmax, ymax]` on every feature, both in the
/// `bounding_box` property and the GeoJSON `bbox` member.
///
/// Skipped when every feature already has one, unless `force` is set.
pub fn add_bounding_boxes(collection: &mut FeatureCollection, force: bool) -> bool {
    if !force && collection.features.iter().all(|f| f.stored_bounding_box().is_some()) {
        return false;
    }

    for feature in &mut collection.features {
        if let Some(bbox) = feature.geometry.as_ref().and_then(|g| bounding_box(&g.coordinates)) {
            store_bounding_box(feature, bbox);
        }
    }
    true
}
