//! Grouped and total sums.
//!
//! Every column is coerced to a number first. Values that do not parse
//! become missing and count as zero in sums. A summed column stays integer
//! only when it had neither missing nor fractional values.

use odp_core::error::TransformError;
use odp_core::models::{Aggregation, Column, Dataset, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Collapse rows according to the aggregation mode
pub fn aggregate(dataset: Dataset, aggregation: &Aggregation) -> Result<Dataset, TransformError> {
    match aggregation {
        Aggregation::None => Ok(dataset),
        Aggregation::GroupBy { columns } => group_by(&dataset, columns),
        Aggregation::Total => total(&dataset),
    }
}

fn numeric_columns(dataset: &Dataset) -> Vec<Column> {
    dataset
        .columns()
        .iter()
        .map(|c| Column::new(c.name.clone(), c.values.iter().map(Value::to_numeric).collect()))
        .collect()
}

fn is_integer_column(values: &[Value]) -> bool {
    values.iter().all(|v| matches!(v, Value::Int(_)))
}

/// Sum of the given rows, missing values counting as zero
fn sum_rows(values: &[Value], rows: &[usize], integer: bool) -> Value {
    if integer {
        let sum: i128 = rows
            .iter()
            .map(|&r| match values[r] {
                Value::Int(i) => i128::from(i),
                _ => 0,
            })
            .sum();
        match i64::try_from(sum) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Float(sum as f64),
        }
    } else {
        Value::Float(rows.iter().filter_map(|&r| values[r].as_f64()).filter(|v| !v.is_nan()).sum())
    }
}

/// One component of a group key. Integer columns keep their exact value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyPart {
    Int(i64),
    Float(f64),
}

impl KeyPart {
    fn as_f64(self) -> f64 {
        match self {
            KeyPart::Int(i) => i as f64,
            KeyPart::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            KeyPart::Int(i) => Value::Int(i),
            KeyPart::Float(f) => Value::Float(f),
        }
    }
}

/// Group key ordered ascending, component by component
#[derive(Debug, Clone, PartialEq)]
struct GroupKey(Vec<KeyPart>);

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(&other.0) {
            let ordering = match (a, b) {
                (KeyPart::Int(x), KeyPart::Int(y)) => x.cmp(y),
                _ => a.as_f64().total_cmp(&b.as_f64()),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

/// Key component of one cell, `None` when the value is missing
fn key_part(value: &Value, integer: bool) -> Option<KeyPart> {
    match value {
        Value::Int(i) if integer => Some(KeyPart::Int(*i)),
        // -0.0 and 0.0 form one group
        other => other.as_f64().filter(|v| !v.is_nan()).map(|v| KeyPart::Float(v + 0.0)),
    }
}

/// Sum every column per distinct combination of the key columns.
///
/// Rows with a missing key are dropped. Key columns come first, in the order
/// given, followed by the remaining columns in their original order.
pub fn group_by(dataset: &Dataset, keys: &[String]) -> Result<Dataset, TransformError> {
    if keys.is_empty() {
        return Err(TransformError::Aggregation {
            reason: "group_by needs at least one key column".to_string(),
        });
    }
    for key in keys {
        if !dataset.has_column(key) {
            return Err(TransformError::MissingColumn {
                column: key.clone(),
                operation: "group_by".to_string(),
            });
        }
    }

    let numeric = numeric_columns(dataset);
    let key_columns: Vec<&Column> =
        keys.iter().filter_map(|k| numeric.iter().find(|c| &c.name == k)).collect();
    // A key column is integer when every present value is
    let integer_keys: Vec<bool> = key_columns
        .iter()
        .map(|c| c.values.iter().filter(|v| !v.is_missing()).all(|v| matches!(v, Value::Int(_))))
        .collect();

    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    let mut dropped = 0;
    'rows: for row in 0..dataset.row_count() {
        let mut key = Vec::with_capacity(key_columns.len());
        for (column, integer) in key_columns.iter().zip(&integer_keys) {
            match key_part(&column.values[row], *integer) {
                Some(part) => key.push(part),
                None => {
                    dropped += 1;
                    continue 'rows;
                }
            }
        }
        groups.entry(GroupKey(key)).or_default().push(row);
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} rows with a missing group key", dropped);
    }

    let mut columns = Vec::with_capacity(numeric.len());

    for (i, column) in key_columns.iter().enumerate() {
        let values = groups.keys().map(|k| k.0[i].into_value()).collect();
        columns.push(Column::new(column.name.clone(), values));
    }

    for column in numeric.iter().filter(|c| !keys.contains(&c.name)) {
        let integer = is_integer_column(&column.values);
        let values = groups.values().map(|rows| sum_rows(&column.values, rows, integer)).collect();
        columns.push(Column::new(column.name.clone(), values));
    }

    tracing::debug!("Grouped {} rows into {} groups", dataset.row_count(), groups.len());

    Dataset::from_columns(columns)
}

/// Sum every column into a single integer row and set `id` to 0
pub fn total(dataset: &Dataset) -> Result<Dataset, TransformError> {
    let all_rows: Vec<usize> = (0..dataset.row_count()).collect();

    let mut columns = Vec::with_capacity(dataset.column_count() + 1);
    for column in numeric_columns(dataset) {
        let value = match sum_rows(&column.values, &all_rows, is_integer_column(&column.values)) {
            Value::Float(f) if !f.is_finite() => {
                return Err(TransformError::Aggregation {
                    reason: format!("Total of column '{}' is not finite", column.name),
                });
            }
            Value::Float(f) => Value::Int(f.trunc() as i64),
            other => other,
        };
        columns.push(Column::new(column.name, vec![value]));
    }

    let mut result = Dataset::from_columns(columns)?;
    result.set_column(Column::new("id", vec![Value::Int(0)]))?;
    Ok(result)
}
