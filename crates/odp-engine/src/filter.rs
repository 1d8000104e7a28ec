use odp_core::error::TransformError;
use odp_core::models::{Dataset, FilterSpec};

/// Keep the rows that satisfy every filter. Cells are compared by their
/// rendered text, so `Int(42)` matches a `starts_with "4"` filter.
pub fn apply_filters(dataset: &mut Dataset, filters: &[FilterSpec]) -> Result<(), TransformError> {
    if filters.is_empty() {
        return Ok(());
    }

    let mut mask = vec![true; dataset.row_count()];
    for filter in filters {
        let column = dataset.column(&filter.key).ok_or_else(|| TransformError::MissingColumn {
            column: filter.key.clone(),
            operation: "filter".to_string(),
        })?;

        for (keep, value) in mask.iter_mut().zip(&column.values) {
            if *keep && !filter.matches(&value.to_string()) {
                *keep = false;
            }
        }
    }

    let before = dataset.row_count();
    dataset.retain_rows(&mask);
    tracing::debug!("Filters kept {} of {} rows", dataset.row_count(), before);

    Ok(())
}
