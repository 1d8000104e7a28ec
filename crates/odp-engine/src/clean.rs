//! Table cleanup around the column stages.
//!
//! [`prepare`] runs on the raw input before type coercion and [`finish`] on
//! the renamed output, before the `id` column is ensured.

use odp_core::models::{Dataset, TableSpec, Value};

/// Label of sub-total rows in statistical office tables
const SUBTOTAL_MARKER: &str = "davon";

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Str(s) => s.is_empty(),
        other => other.is_missing(),
    }
}

/// Skip leading rows and columns, drop incomplete rows, remove line breaks
pub fn prepare(dataset: &mut Dataset, spec: &TableSpec) {
    skip(dataset, spec.skip_rows, spec.skip_cols);
    if spec.dropna {
        drop_incomplete_rows(dataset);
    }
    strip_line_breaks(dataset);
}

/// Limit the row count and drop rows without content
pub fn finish(dataset: &mut Dataset, spec: &TableSpec) {
    if let Some(rows) = spec.head {
        let mask: Vec<bool> = (0..dataset.row_count()).map(|row| row < rows).collect();
        dataset.retain_rows(&mask);
    }
    if spec.drop_empty_rows {
        drop_empty_rows(dataset);
    }
}

fn skip(dataset: &mut Dataset, rows: usize, cols: usize) {
    if cols > 0 {
        let names: Vec<String> =
            dataset.column_names().into_iter().skip(cols).map(str::to_string).collect();
        let keep: Vec<&str> = names.iter().map(String::as_str).collect();
        dataset.select(&keep);
    }
    if rows > 0 {
        let mask: Vec<bool> = (0..dataset.row_count()).map(|row| row >= rows).collect();
        dataset.retain_rows(&mask);
    }
}

fn drop_incomplete_rows(dataset: &mut Dataset) {
    let mut mask = vec![true; dataset.row_count()];
    for column in dataset.columns() {
        for (keep, value) in mask.iter_mut().zip(&column.values) {
            if is_blank(value) {
                *keep = false;
            }
        }
    }

    let before = dataset.row_count();
    dataset.retain_rows(&mask);
    tracing::debug!("Dropped {} rows with empty cells", before - dataset.row_count());
}

fn strip_line_breaks(dataset: &mut Dataset) {
    for value in dataset.values_mut() {
        if let Value::Str(text) = value {
            if text.contains(['\n', '\r']) || text.trim().len() != text.len() {
                *text = text.replace(['\n', '\r'], "").trim().to_string();
            }
        }
    }
}

fn drop_empty_rows(dataset: &mut Dataset) {
    for value in dataset.values_mut() {
        if let Value::Str(text) = value {
            if text.as_str() == SUBTOTAL_MARKER {
                text.clear();
            }
        }
    }

    let mut mask = vec![false; dataset.row_count()];
    for column in dataset.columns() {
        for (keep, value) in mask.iter_mut().zip(&column.values) {
            if !is_blank(value) {
                *keep = true;
            }
        }
    }

    let before = dataset.row_count();
    dataset.retain_rows(&mask);
    tracing::debug!("Dropped {} empty rows", before - dataset.row_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use odp_core::models::Column;

    fn dataset(columns: &[(&str, &[&str])]) -> Dataset {
        Dataset::from_columns(
            columns
                .iter()
                .map(|(name, values)| {
                    Column::new(*name, values.iter().map(|v| Value::str(*v)).collect())
                })
                .collect(),
        )
        .unwrap()
    }

    fn texts(data: &Dataset, column: &str) -> Vec<String> {
        data.column(column).unwrap().values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_skip_rows_and_cols() {
        let mut data = dataset(&[
            ("note", &["source: office", "", ""]),
            ("district", &["", "Mitte", "Pankow"]),
            ("count", &["", "12", "7"]),
        ]);
        let spec = TableSpec { skip_rows: 1, skip_cols: 1, ..Default::default() };

        prepare(&mut data, &spec);

        assert_eq!(data.column_names(), vec!["district", "count"]);
        assert_eq!(texts(&data, "district"), vec!["Mitte", "Pankow"]);
    }

    #[test]
    fn test_dropna_removes_rows_with_any_empty_cell() {
        let mut data = Dataset::from_columns(vec![
            Column::new("a", vec![Value::str("1"), Value::str(""), Value::str("3")]),
            Column::new("b", vec![Value::str("x"), Value::str("y"), Value::Null]),
        ])
        .unwrap();
        let spec = TableSpec { dropna: true, ..Default::default() };

        prepare(&mut data, &spec);

        assert_eq!(data.row_count(), 1);
        assert_eq!(texts(&data, "a"), vec!["1"]);
    }

    #[test]
    fn test_line_breaks_removed_and_trimmed() {
        let mut data = Dataset::from_columns(vec![Column::new("name", vec![
            Value::str("Kita\nSonnenschein "),
            Value::str("\r\nMitte"),
            Value::Int(4),
        ])])
        .unwrap();

        prepare(&mut data, &TableSpec::default());

        assert_eq!(data.column("name").unwrap().values, vec![
            Value::str("KitaSonnenschein"),
            Value::str("Mitte"),
            Value::Int(4),
        ]);
    }

    #[test]
    fn test_head_keeps_first_rows() {
        let mut data = dataset(&[("a", &["1", "2", "3"])]);
        finish(&mut data, &TableSpec::default().with_head(2));
        assert_eq!(texts(&data, "a"), vec!["1", "2"]);

        let mut short = dataset(&[("a", &["1"])]);
        finish(&mut short, &TableSpec::default().with_head(5));
        assert_eq!(short.row_count(), 1);
    }

    #[test]
    fn test_empty_rows_dropped_and_subtotal_labels_blanked() {
        let mut data = Dataset::from_columns(vec![
            Column::new("label", vec![
                Value::str("Mitte"),
                Value::str("davon"),
                Value::str(""),
                Value::str("davon"),
            ]),
            Column::new("count", vec![Value::Int(3), Value::Null, Value::Null, Value::Int(1)]),
        ])
        .unwrap();
        let spec = TableSpec { drop_empty_rows: true, ..Default::default() };

        finish(&mut data, &spec);

        assert_eq!(data.column("label").unwrap().values, vec![Value::str("Mitte"), Value::str("")]);
        assert_eq!(data.column("count").unwrap().values, vec![Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn test_empty_rows_kept_by_default() {
        let mut data = dataset(&[("a", &["", "1"])]);
        finish(&mut data, &TableSpec::default());
        assert_eq!(data.row_count(), 2);
    }
}
