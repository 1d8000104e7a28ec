//! Cell values and semantic column types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of a [`Dataset`](super::Dataset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Create a string value
    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    /// Whether the value counts as missing (null or NaN)
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the value, parsing strings when possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Best-effort numeric conversion used by aggregation.
    ///
    /// Unparsable values become [`Value::Null`], mirroring a coercing
    /// `to_numeric`: they are treated as missing and sum as zero.
    pub fn to_numeric(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Int(i64::from(*b)),
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) if f.is_nan() => Value::Null,
            Value::Float(f) => Value::Float(*f),
            Value::Str(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::Int(i)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if !f.is_nan() => Value::Float(f),
                        _ => Value::Null,
                    }
                }
            }
        }
    }

    /// Convert to the given semantic type, returning `None` when the value
    /// cannot be represented in it. Nulls stay null in every type.
    pub fn coerce(&self, target: SemanticType) -> Option<Value> {
        if matches!(self, Value::Null) {
            return Some(Value::Null);
        }

        match target {
            SemanticType::String => Some(Value::Str(self.to_string())),
            SemanticType::Integer => match self {
                Value::Int(i) => Some(Value::Int(*i)),
                Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(Value::Int(*f as i64)),
                Value::Bool(b) => Some(Value::Int(i64::from(*b))),
                Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::Int),
                _ => None,
            },
            SemanticType::Float => match self {
                Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Float),
                other => other.as_f64().map(Value::Float),
            },
            SemanticType::Boolean => match self {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Int(0) => Some(Value::Bool(false)),
                Value::Int(1) => Some(Value::Bool(true)),
                Value::Str(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" => Some(Value::Bool(true)),
                    "false" | "0" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Render a float the way tabular outputs expect it: integral values keep a
/// trailing `.0`, NaN renders as an empty cell.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Declared semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    #[serde(alias = "str")]
    String,
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// What to do with values that cannot be coerced to their declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Fail the transform on the first value that does not coerce
    Strict,
    /// Keep the original value and carry on
    #[default]
    Lenient,
}
