//! CRS transformation of coordinates and feature collections

use crate::models::{Coordinates, Crs, FeatureCollection};
use crate::repair::refresh_bounding_box;
use odp_core::error::ProjectionError;
use proj::Proj;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.matches(crs2)
}

/// A prepared transformation between two coordinate systems.
///
/// Built once per column or collection and reused for every position.
/// Matching systems short-circuit to the identity.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    proj: Option<Proj>,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("identity", &self.proj.is_none())
            .finish()
    }
}

impl Reprojector {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self, ProjectionError> {
        if crs_match(source, target) {
            return Ok(Self { source: source.clone(), target: target.clone(), proj: None });
        }

        let from = source.identifier();
        let to = target.identifier();

        let proj = Proj::new_known_crs(&from, &to, None).map_err(|e| ProjectionError::Transform {
            from: from.clone(),
            to: to.clone(),
            reason: format!("Failed to create projection: {}", e),
        })?;

        tracing::debug!("Prepared projection {} -> {}", from, to);

        Ok(Self { source: source.clone(), target: target.clone(), proj: Some(proj) })
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    /// Transform a single `(x, y)` pair, longitude/easting first
    pub fn reproject_point(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }

        let Some(proj) = &self.proj else {
            return Ok((x, y));
        };

        let (tx, ty) = proj.convert((x, y)).map_err(|e| ProjectionError::Transform {
            from: self.source.identifier(),
            to: self.target.identifier(),
            reason: e.to_string(),
        })?;

        if !tx.is_finite() || !ty.is_finite() {
            return Err(ProjectionError::NonFinite { x: tx, y: ty });
        }

        Ok((tx, ty))
    }

    /// Transform every position of a coordinate structure.
    ///
    /// Ordinates past the second (elevation, measure) are kept unchanged.
    pub fn reproject(&self, coordinates: &Coordinates) -> Result<Coordinates, ProjectionError> {
        coordinates.try_map_positions(&mut |position: &[f64]| {
            if position.len() < 2 {
                return Err(ProjectionError::IncompletePosition { found: position.len() });
            }
            let (x, y) = self.reproject_point(position[0], position[1])?;
            let mut out = Vec::with_capacity(position.len());
            out.push(x);
            out.push(y);
            out.extend_from_slice(&position[2..]);
            Ok(out)
        })
    }
}

/// Reproject a coordinate structure from one CRS to another
pub fn reproject(
    coordinates: &Coordinates,
    source: &Crs,
    target: &Crs,
) -> Result<Coordinates, ProjectionError> {
    Reprojector::new(source, target)?.reproject(coordinates)
}

/// Reproject every feature of a collection into `target`.
///
/// Returns `false` without touching the collection when it already declares
/// the target system, unless `force` is set. Collections without a `crs`
/// member are taken to be in WGS 84. Bounding boxes already present on a
/// feature are recomputed for the new coordinates.
pub fn reproject_collection(
    collection: &mut FeatureCollection,
    target: &Crs,
    force: bool,
) -> Result<bool, ProjectionError> {
    let source = match collection.crs_name() {
        Some(name) => name.parse::<Crs>()?,
        None => {
            tracing::debug!("Collection declares no CRS, assuming {}", Crs::wgs84());
            Crs::wgs84()
        }
    };

    if !force && crs_match(&source, target) {
        tracing::debug!("Collection already in {}", target);
        return Ok(false);
    }

    let reprojector = Reprojector::new(&source, target)?;

    for feature in &mut collection.features {
        let Some(geometry) = feature.geometry.as_mut() else {
            continue;
        };
        geometry.coordinates = reprojector.reproject(&geometry.coordinates)?;
        refresh_bounding_box(feature);
    }

    collection.set_crs(target);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureGeometry, GeoFeature};
    use odp_core::models::BOUNDING_BOX_PROPERTY;

    #[test]
    fn test_identity_reprojection() {
        let reprojector = Reprojector::new(&Crs::wgs84(), &Crs::crs84()).unwrap();
        assert!(reprojector.is_identity());
        assert_eq!(reprojector.reproject_point(13.4, 52.5).unwrap(), (13.4, 52.5));
    }

    #[test]
    fn test_utm_to_wgs84() {
        let reprojector = Reprojector::new(&Crs::etrs89_utm33n(), &Crs::wgs84()).unwrap();
        // Brandenburg Gate
        let (lon, lat) = reprojector.reproject_point(389_880.0, 5_819_740.0).unwrap();
        assert!((lon - 13.377).abs() < 0.01, "lon was {}", lon);
        assert!((lat - 52.516).abs() < 0.01, "lat was {}", lat);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let reprojector = Reprojector::new(&Crs::wgs84(), &Crs::wgs84()).unwrap();
        assert!(matches!(
            reprojector.reproject_point(f64::NAN, 1.0),
            Err(ProjectionError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_reproject_keeps_extra_ordinates() {
        let coords = Coordinates::Nested(vec![Coordinates::Position(vec![1.0, 2.0, 34.0])]);
        let out = reproject(&coords, &Crs::wgs84(), &Crs::wgs84()).unwrap();
        assert_eq!(out, coords);
    }

    #[test]
    fn test_incomplete_position() {
        let coords = Coordinates::Position(vec![1.0]);
        assert!(matches!(
            reproject(&coords, &Crs::wgs84(), &Crs::wgs84()),
            Err(ProjectionError::IncompletePosition { found: 1 })
        ));
    }

    #[test]
    fn test_collection_in_target_is_skipped() {
        let mut collection = FeatureCollection::default();
        collection.set_crs(&Crs::wgs84());
        assert!(!reproject_collection(&mut collection, &Crs::wgs84(), false).unwrap());
        assert!(reproject_collection(&mut collection, &Crs::wgs84(), true).unwrap());
    }

    #[test]
    fn test_collection_reprojection_rewrites_crs_and_bbox() {
        let feature = GeoFeature::new(Some(FeatureGeometry::new(
            "Point",
            Coordinates::position(389_880.0, 5_819_740.0),
        )))
        .with_property(BOUNDING_BOX_PROPERTY, vec![0.0, 0.0, 0.0, 0.0]);

        let mut collection = FeatureCollection::new(vec![feature]);
        collection.set_crs(&Crs::etrs89_utm33n());

        assert!(reproject_collection(&mut collection, &Crs::wgs84(), false).unwrap());
        assert_eq!(collection.crs_name(), Some("urn:ogc:def:crs:EPSG::4326"));

        let bbox = collection.features[0].properties[BOUNDING_BOX_PROPERTY].as_array().unwrap();
        let min_x = bbox[0].as_f64().unwrap();
        assert!((min_x - 13.377).abs() < 0.01);
    }
}
