//! Error types for the transformation pipeline
//!
//! Every error here is recoverable at the granularity of a single output file:
//! the runner records the failure and moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the column transform engine and of feature property transforms
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Column '{column}' referenced by {operation} does not exist")]
    MissingColumn { column: String, operation: String },

    #[error("Column '{column}' appears more than once")]
    DuplicateColumn { column: String },

    #[error("Column '{column}' has {found} values, expected {expected}")]
    RaggedColumns { column: String, expected: usize, found: usize },

    #[error("Cannot coerce value '{value}' in column '{column}' to {target}")]
    Coercion { column: String, value: String, target: String },

    #[error("Mapping for column '{column}' has no entry for key '{key}'")]
    MissingMappingKey { column: String, key: String },

    #[error("Property '{property}' referenced by {operation} does not exist on feature {feature}")]
    MissingProperty { property: String, operation: String, feature: String },

    #[error("Invalid aggregation: {reason}")]
    Aggregation { reason: String },

    #[error("Column '{column}' declares a spatial lookup but no reference features were supplied")]
    MissingSpatialContext { column: String },

    #[error("Cannot prepare reprojection for column '{column}': {source}")]
    InvalidProjection {
        column: String,
        #[source]
        source: ProjectionError,
    },

    #[error("Reprojection failed for column '{column}' at row {row}: {source}")]
    Projection {
        column: String,
        row: usize,
        #[source]
        source: ProjectionError,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Failures of the coordinate reprojector
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Invalid CRS identifier '{identifier}': {reason}")]
    InvalidCrs { identifier: String, reason: String },

    #[error("Coordinate ({x}, {y}) is not finite")]
    NonFinite { x: f64, y: f64 },

    #[error("Position has {found} ordinates, at least 2 are required")]
    IncompletePosition { found: usize },

    #[error("Failed to transform from {from} to {to}: {reason}")]
    Transform { from: String, to: String, reason: String },
}

/// Failures of the geometry repair stage
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Invalid geometry at feature {feature_id}: nesting depth {depth} exceeds {max}")]
    NestingTooDeep { feature_id: String, depth: usize, max: usize },

    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    Invalid { feature_id: String, reason: String },
}

/// Failures of the persistent spatial feature cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot read feature cache at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Cannot write feature cache at {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Feature cache at {path} is malformed at line {line}: {reason}")]
    Malformed { path: PathBuf, line: u64, reason: String },
}

/// Umbrella error for callers that deal with more than one stage
#[derive(Debug, Error)]
pub enum OdpError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OdpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_error_wraps_into_transform_error() {
        let err = TransformError::Projection {
            column: "lon".to_string(),
            row: 3,
            source: ProjectionError::NonFinite { x: f64::NAN, y: 1.0 },
        };
        let message = err.to_string();
        assert!(message.contains("'lon'"));
        assert!(message.contains("row 3"));
    }

    #[test]
    fn test_cache_error_converts_to_odp_error() {
        let err: OdpError =
            CacheError::Write { path: PathBuf::from("cache.csv"), reason: "denied".to_string() }
                .into();
        assert!(matches!(err, OdpError::Cache(_)));
        assert!(err.to_string().contains("cache.csv"));
    }
}
