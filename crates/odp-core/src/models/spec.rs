//! Declarative transformation specification.
//!
//! These types are the parsed form of a transformation file: for every input
//! port a list of files, and for every file the ordered column operations,
//! filters and aggregation the engine applies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::geometry::Crs;
use super::value::{SemanticType, Value};

/// Target column description with at most one derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Name of the target column (before rename)
    pub name: String,

    /// Declared semantic type, applied to columns present before derivation
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<SemanticType>,

    /// How the column's values are produced, if not read from the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive: Option<Derive>,

    /// Left-pad with zeros to this width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_pad: Option<usize>,

    /// Strip these leading characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_strip: Option<String>,

    /// Keep only the first `n` characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<usize>,

    /// Keep only the last `n` characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<usize>,

    /// Text normalization applied after value mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ValueFormat>,

    /// Drop the column from the output
    #[serde(default)]
    pub remove: bool,

    /// Output name of the column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl ColumnSpec {
    /// Plain column passed through from the input
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            derive: None,
            zero_pad: None,
            left_strip: None,
            first: None,
            last: None,
            format: None,
            remove: false,
            rename: None,
        }
    }

    pub fn with_type(mut self, data_type: SemanticType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_derive(mut self, derive: Derive) -> Self {
        self.derive = Some(derive);
        self
    }

    pub fn with_zero_pad(mut self, width: usize) -> Self {
        self.zero_pad = Some(width);
        self
    }

    pub fn with_left_strip(mut self, chars: impl Into<String>) -> Self {
        self.left_strip = Some(chars.into());
        self
    }

    pub fn with_first(mut self, count: usize) -> Self {
        self.first = Some(count);
        self
    }

    pub fn with_last(mut self, count: usize) -> Self {
        self.last = Some(count);
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn removed(mut self) -> Self {
        self.remove = true;
        self
    }

    pub fn renamed(mut self, to: impl Into<String>) -> Self {
        self.rename = Some(to.into());
        self
    }
}

/// Text normalizations for columns read from hand-maintained sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// Berlin landline number in `+4930...` form
    PhoneNumber,
    /// Decimal comma turned into a point, quotes removed
    Coordinate,
}

/// Which component of a reprojected coordinate a column receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Lon,
    Lat,
}

/// Column derivations. Each variant names the columns it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Derive {
    /// Same value in every row
    Literal { value: Value },

    /// Join source columns with a delimiter
    Concat {
        columns: Vec<String>,
        #[serde(default)]
        delimiter: String,
    },

    /// Character slice `[last_n:first_n]` of a source column, negative bounds count from the end
    Split {
        column: String,
        #[serde(default)]
        first_n: Option<i64>,
        #[serde(default)]
        last_n: Option<i64>,
    },

    /// Duplicate of a source column
    Copy { column: String },

    /// `numerator / denominator * 100`
    Fraction {
        numerator: String,
        denominator: String,
        #[serde(default = "default_fraction_decimals")]
        decimals: Option<u32>,
    },

    /// Lookup of a key column in a literal table
    Mapping {
        #[serde(default = "default_mapping_key")]
        key: String,
        table: BTreeMap<String, Value>,
        #[serde(default)]
        default: Option<Value>,
    },

    /// One component of a reprojected coordinate pair
    Coordinate {
        lon_column: String,
        lat_column: String,
        #[serde(default = "default_source_crs")]
        source_crs: Crs,
        #[serde(default = "Crs::wgs84")]
        target_crs: Crs,
        axis: Axis,
    },

    /// Id of the reference feature containing the point
    SpatialId { lat_column: String, lon_column: String },
}

fn default_fraction_decimals() -> Option<u32> {
    Some(2)
}

fn default_mapping_key() -> String {
    "id".to_string()
}

fn default_source_crs() -> Crs {
    Crs::etrs89_utm33n()
}

/// Row predicate on the rendered value of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub key: String,
    pub operation: FilterOp,
    pub value: String,
}

impl FilterSpec {
    pub fn new(key: impl Into<String>, operation: FilterOp, value: impl Into<String>) -> Self {
        Self { key: key.into(), operation, value: value.into() }
    }

    /// Whether a rendered cell satisfies the predicate
    pub fn matches(&self, cell: &str) -> bool {
        match self.operation {
            FilterOp::StartsWith => cell.starts_with(&self.value),
            FilterOp::DoesNotStartWith => !cell.starts_with(&self.value),
            FilterOp::EndsWith => cell.ends_with(&self.value),
            FilterOp::DoesNotEndWith => !cell.ends_with(&self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    StartsWith,
    DoesNotStartWith,
    EndsWith,
    DoesNotEndWith,
}

/// How rows are collapsed before the post-aggregation stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    None,
    /// Sum numeric columns per distinct key
    GroupBy { columns: Vec<String> },
    /// Sum every column into a single row with `id = 0`
    Total,
}

/// Everything the column transform engine needs for one output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSpec {
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    #[serde(default)]
    pub filters: Vec<FilterSpec>,

    #[serde(default)]
    pub aggregation: Aggregation,

    /// Rows dropped from the top of the input
    #[serde(default)]
    pub skip_rows: usize,

    /// Columns dropped from the left of the input
    #[serde(default)]
    pub skip_cols: usize,

    /// Drop input rows that have any empty cell
    #[serde(default)]
    pub dropna: bool,

    /// Keep at most this many output rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<usize>,

    /// Drop output rows without any content, `davon` cells counting as empty
    #[serde(default)]
    pub drop_empty_rows: bool,
}

impl TableSpec {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns, ..Default::default() }
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_head(mut self, rows: usize) -> Self {
        self.head = Some(rows);
        self
    }

    /// Whether any column needs reference features for a spatial lookup
    pub fn needs_spatial_lookup(&self) -> bool {
        self.columns.iter().any(|c| matches!(c.derive, Some(Derive::SpatialId { .. })))
    }
}

/// Transformation of a single GeoJSON feature property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(flatten)]
    pub op: PropertyOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PropertyOp {
    /// Set the property when the feature does not have it yet
    Value { value: serde_json::Value },
    /// Join string properties without delimiter, when all of them exist
    Concat { properties: Vec<String> },
    ZeroPad { width: usize },
    /// Keep the last `count` characters
    LastChars { count: usize },
    Mapping {
        #[serde(default = "default_mapping_key")]
        key: String,
        table: BTreeMap<String, serde_json::Value>,
    },
    Remove,
    Rename { to: String },
}

/// One output file of an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub source_file_name: String,
    pub target_file_name: String,

    /// GeoJSON file with the reference polygons for spatial lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_file_name: Option<String>,

    /// CRS the geodata output is reprojected to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_crs: Option<Crs>,

    #[serde(flatten)]
    pub table: TableSpec,

    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPort {
    pub id: String,
    #[serde(default)]
    pub files: Vec<FileSpec>,
}

/// Root of a transformation file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformationSpec {
    #[serde(default)]
    pub input_ports: Vec<InputPort>,
}

impl TransformationSpec {
    /// Total number of declared output files
    pub fn file_count(&self) -> usize {
        self.input_ports.iter().map(|p| p.files.len()).sum()
    }
}
