//! GeoJSON feature documents.
//!
//! Coordinates are kept as a recursive structure instead of typed geometries
//! so that malformed nesting survives deserialization and can be repaired or
//! rejected by the geometry stage.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::geometry::Crs;

/// Recursive coordinate array of a GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    /// A numeric position `[x, y, ...]`
    Position(Vec<f64>),
    /// An array of nested coordinate arrays
    Nested(Vec<Coordinates>),
}

impl Coordinates {
    pub fn position(x: f64, y: f64) -> Self {
        Coordinates::Position(vec![x, y])
    }

    /// Build a ring from `(x, y)` pairs
    pub fn ring(points: &[(f64, f64)]) -> Self {
        Coordinates::Nested(points.iter().map(|&(x, y)| Self::position(x, y)).collect())
    }

    /// Number of array levels. A position counts as one.
    pub fn depth(&self) -> usize {
        match self {
            Coordinates::Position(_) => 1,
            Coordinates::Nested(children) => {
                1 + children.iter().map(Coordinates::depth).max().unwrap_or(0)
            }
        }
    }

    /// Child entries, empty for a position
    pub fn children(&self) -> &[Coordinates] {
        match self {
            Coordinates::Position(_) => &[],
            Coordinates::Nested(children) => children,
        }
    }

    /// All numeric positions in document order
    pub fn positions(&self) -> Vec<&[f64]> {
        let mut out = Vec::new();
        self.collect_positions(&mut out);
        out
    }

    fn collect_positions<'a>(&'a self, out: &mut Vec<&'a [f64]>) {
        match self {
            Coordinates::Position(p) => out.push(p),
            Coordinates::Nested(children) => {
                for child in children {
                    child.collect_positions(out);
                }
            }
        }
    }

    /// Number of positions in the whole structure
    pub fn position_count(&self) -> usize {
        match self {
            Coordinates::Position(_) => 1,
            Coordinates::Nested(children) => children.iter().map(Coordinates::position_count).sum(),
        }
    }

    /// Rebuild the structure with every position passed through `f`
    pub fn try_map_positions<E, F>(&self, f: &mut F) -> Result<Coordinates, E>
    where
        F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
    {
        match self {
            Coordinates::Position(p) => f(p).map(Coordinates::Position),
            Coordinates::Nested(children) => children
                .iter()
                .map(|child| child.try_map_positions(f))
                .collect::<Result<Vec<_>, E>>()
                .map(Coordinates::Nested),
        }
    }
}

/// Geometry member of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Coordinates,
}

impl FeatureGeometry {
    pub fn new(kind: impl Into<String>, coordinates: Coordinates) -> Self {
        Self { kind: kind.into(), coordinates }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// `[xmin, ymin, xmax, ymax]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Property under which a feature's bounding box is persisted
pub const BOUNDING_BOX_PROPERTY: &str = "bounding_box";

/// A GeoJSON feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,

    #[serde(default)]
    pub geometry: Option<FeatureGeometry>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, JsonValue>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GeoFeature {
    pub fn new(geometry: Option<FeatureGeometry>) -> Self {
        Self { kind: feature_type(), id: None, geometry, properties: Map::new(), bbox: None }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<JsonValue>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier used by spatial lookups: `properties.id`, else the feature `id`
    pub fn feature_id(&self) -> Option<String> {
        self.properties.get("id").or(self.id.as_ref()).and_then(render_json_scalar)
    }

    /// Label for diagnostics, never empty
    pub fn label(&self) -> String {
        self.feature_id().unwrap_or_else(|| "<unnamed>".to_string())
    }

    /// Bounding box stored in the properties, if any
    pub fn stored_bounding_box(&self) -> Option<&JsonValue> {
        self.properties.get(BOUNDING_BOX_PROPERTY)
    }
}

/// Render a JSON scalar the way it appears in tabular outputs
pub fn render_json_scalar(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// A GeoJSON feature collection. Unknown top-level members are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,

    #[serde(default)]
    pub features: Vec<GeoFeature>,

    #[serde(flatten)]
    pub foreign_members: Map<String, JsonValue>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<GeoFeature>) -> Self {
        Self { kind: feature_collection_type(), crs: None, features, foreign_members: Map::new() }
    }

    /// Value of `crs.properties.name`
    pub fn crs_name(&self) -> Option<&str> {
        self.crs.as_ref()?.get("properties")?.get("name")?.as_str()
    }

    /// Parsed CRS of the collection, if declared and understood
    pub fn declared_crs(&self) -> Option<Crs> {
        self.crs_name().and_then(|name| name.parse().ok())
    }

    /// Set the named `crs` member
    pub fn set_crs(&mut self, crs: &Crs) {
        self.crs = Some(serde_json::json!({
            "type": "name",
            "properties": { "name": crs.urn() }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_depth() {
        let point: Coordinates = serde_json::from_str("[13.4, 52.5]").unwrap();
        assert_eq!(point.depth(), 1);

        let polygon: Coordinates =
            serde_json::from_str("[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]").unwrap();
        assert_eq!(polygon.depth(), 3);
        assert_eq!(polygon.position_count(), 4);

        let multi: Coordinates = serde_json::from_str("[[[[0.0, 0.0], [1.0, 1.0]]]]").unwrap();
        assert_eq!(multi.depth(), 4);
    }

    #[test]
    fn test_feature_id_prefers_property() {
        let feature = GeoFeature::new(None).with_id("outer").with_property("id", 11);
        assert_eq!(feature.feature_id().as_deref(), Some("11"));

        let fallback = GeoFeature::new(None).with_id("outer");
        assert_eq!(fallback.feature_id().as_deref(), Some("outer"));
    }

    #[test]
    fn test_collection_preserves_foreign_members() {
        let json = r#"{
            "type": "FeatureCollection",
            "name": "districts",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::25833"}},
            "features": [{"type": "Feature", "properties": null, "geometry": null}]
        }"#;
        let collection: FeatureCollection = serde_json::from_str(json).unwrap();

        assert_eq!(collection.foreign_members.get("name").unwrap(), "districts");
        assert_eq!(collection.declared_crs().unwrap().epsg, 25833);
        assert!(collection.features[0].properties.is_empty());

        let back = serde_json::to_value(&collection).unwrap();
        assert_eq!(back["name"], "districts");
    }

    #[test]
    fn test_try_map_positions_keeps_structure() {
        let ring = Coordinates::ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        let doubled: Result<Coordinates, ()> =
            ring.try_map_positions(&mut |p| Ok(p.iter().map(|v| v * 2.0).collect()));
        assert_eq!(doubled.unwrap(), Coordinates::ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]));
    }
}
