pub mod dataset;
pub mod feature;
pub mod geometry;
pub mod spec;
pub mod value;

pub use dataset::{Column, Dataset};
pub use feature::{
    render_json_scalar, BoundingBox, Coordinates, FeatureCollection, FeatureGeometry, GeoFeature,
    BOUNDING_BOX_PROPERTY,
};
pub use geometry::{Crs, ValidityMode};
pub use spec::{
    Aggregation, Axis, ColumnSpec, Derive, FileSpec, FilterOp, FilterSpec, InputPort, PropertyOp,
    PropertySpec, TableSpec, TransformationSpec, ValueFormat,
};
pub use value::{format_float, CoercionPolicy, SemanticType, Value};
