use crate::error::TransformError;
use serde::{Deserialize, Serialize};

use super::value::Value;

/// A named column of cell values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self { name: name.into(), values }
    }

    /// Column holding the same value in every row
    pub fn repeat(name: impl Into<String>, value: Value, rows: usize) -> Self {
        Self { name: name.into(), values: vec![value; rows] }
    }
}

/// Row-oriented tabular dataset stored column by column.
///
/// All columns have the same length and column names are unique. Both
/// invariants are checked on construction and kept by every mutator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Create a dataset from columns, validating length and name uniqueness
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TransformError> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);

        for (i, column) in columns.iter().enumerate() {
            if column.values.len() != rows {
                return Err(TransformError::RaggedColumns {
                    column: column.name.clone(),
                    expected: rows,
                    found: column.values.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TransformError::DuplicateColumn { column: column.name.clone() });
            }
        }

        Ok(Self { columns, rows })
    }

    /// Create a dataset from a header and string records, as produced by a CSV reader
    pub fn from_records<S: AsRef<str>>(
        header: &[S],
        records: Vec<Vec<String>>,
    ) -> Result<Self, TransformError> {
        let mut columns: Vec<Column> =
            header.iter().map(|name| Column::new(name.as_ref(), Vec::new())).collect();

        for record in records {
            if record.len() != columns.len() {
                return Err(TransformError::RaggedColumns {
                    column: format!("record {}", columns.first().map_or(0, |c| c.values.len())),
                    expected: columns.len(),
                    found: record.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(record) {
                column.values.push(Value::Str(cell));
            }
        }

        Self::from_columns(columns)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Every cell, column by column
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.columns.iter_mut().flat_map(|c| c.values.iter_mut())
    }

    /// Values of one row, in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Replace an existing column in place or append a new one at the end
    pub fn set_column(&mut self, column: Column) -> Result<(), TransformError> {
        self.check_length(&column)?;

        match self.position(&column.name) {
            Some(idx) => self.columns[idx] = column,
            None => {
                if self.columns.is_empty() {
                    self.rows = column.values.len();
                }
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Set a column and move it to the first position
    pub fn insert_first(&mut self, column: Column) -> Result<(), TransformError> {
        self.check_length(&column)?;

        if let Some(idx) = self.position(&column.name) {
            self.columns.remove(idx);
        }
        if self.columns.is_empty() {
            self.rows = column.values.len();
        }
        self.columns.insert(0, column);
        Ok(())
    }

    /// Move an existing column to the first position
    pub fn move_first(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                let column = self.columns.remove(idx);
                self.columns.insert(0, column);
                true
            }
            None => false,
        }
    }

    /// Rename a column. Renaming onto an existing name replaces that column.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.has_column(from);
        }
        if !self.has_column(from) {
            return false;
        }
        if let Some(existing) = self.position(to) {
            self.columns.remove(existing);
        }
        match self.position(from) {
            Some(idx) => {
                self.columns[idx].name = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Keep only the named columns, in the given order. Unknown names are skipped
    /// and the row count is preserved even when no column survives.
    pub fn select(&mut self, names: &[&str]) {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            if selected.iter().any(|c: &Column| c.name == *name) {
                continue;
            }
            if let Some(idx) = self.position(name) {
                selected.push(self.columns.remove(idx));
            }
        }
        self.columns = selected;
    }

    /// Keep only rows whose mask entry is true
    pub fn retain_rows(&mut self, mask: &[bool]) {
        for column in &mut self.columns {
            let mut keep = mask.iter();
            column.values.retain(|_| keep.next().copied().unwrap_or(false));
        }
        self.rows = mask.iter().take(self.rows).filter(|keep| **keep).count();
    }

    fn check_length(&self, column: &Column) -> Result<(), TransformError> {
        if !self.columns.is_empty() && column.values.len() != self.rows {
            return Err(TransformError::RaggedColumns {
                column: column.name.clone(),
                expected: self.rows,
                found: column.values.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_records(
            &["a", "b"],
            vec![vec!["1".into(), "x".into()], vec!["2".into(), "y".into()]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_ragged() {
        let err = Dataset::from_columns(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, TransformError::RaggedColumns { .. }));
    }

    #[test]
    fn test_from_columns_rejects_duplicates() {
        let err = Dataset::from_columns(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("a", vec![Value::Int(2)]),
        ])
        .unwrap_err();
        assert!(matches!(err, TransformError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_insert_first_relocates_existing() {
        let mut dataset = sample();
        dataset.insert_first(Column::new("b", vec![Value::Int(9), Value::Int(8)])).unwrap();
        assert_eq!(dataset.column_names(), vec!["b", "a"]);
        assert_eq!(dataset.column("b").unwrap().values[0], Value::Int(9));
    }

    #[test]
    fn test_set_column_checks_length() {
        let mut dataset = sample();
        assert!(dataset.set_column(Column::new("c", vec![Value::Null])).is_err());
        dataset.set_column(Column::repeat("c", Value::Int(0), 2)).unwrap();
        assert_eq!(dataset.column_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rename_onto_existing_replaces() {
        let mut dataset = sample();
        assert!(dataset.rename_column("b", "a"));
        assert_eq!(dataset.column_names(), vec!["a"]);
        assert_eq!(dataset.column("a").unwrap().values[0], Value::str("x"));
    }

    #[test]
    fn test_select_orders_by_request() {
        let mut dataset = sample();
        dataset.select(&["b", "missing", "a"]);
        assert_eq!(dataset.column_names(), vec!["b", "a"]);
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn test_retain_rows() {
        let mut dataset = sample();
        dataset.retain_rows(&[false, true]);
        assert_eq!(dataset.row_count(), 1);
        assert_eq!(dataset.row(0).unwrap(), vec![&Value::str("2"), &Value::str("y")]);
    }
}
