//! The column transform engine.
//!
//! A [`TableSpec`] is applied to a [`Dataset`] in a fixed order of stages:
//!
//! 1. input cleanup: skipped rows and columns, `dropna`, line breaks
//! 2. type coercion of columns already present
//! 3. literal values
//! 4. coordinate reprojection, all `lon` columns before all `lat` columns
//! 5. spatial ids
//! 6. concat (relocated first)
//! 7. split
//! 8. filters
//! 9. copy (relocated first)
//! 10. zero pad
//! 11. left strip
//! 12. first / last character truncation
//! 13. aggregation
//! 14. copy and zero pad again
//! 15. fraction
//! 16. value mapping (relocated first)
//! 17. value formats
//! 18. pruning to the declared, non-removed columns
//! 19. rename
//! 20. `head` row limit and empty row removal
//! 21. `id` column ensured and moved first
//!
//! Any stage failure aborts the whole transform; the input dataset is
//! consumed either way.

use crate::aggregate::aggregate;
use crate::clean;
use crate::filter::apply_filters;
use crate::format::{
    coordinate_text, last_chars, left_strip, percentage, phone_number, slice_chars, zero_pad,
};
use odp_core::error::TransformError;
use odp_core::models::{
    Axis, CoercionPolicy, Column, ColumnSpec, Dataset, Derive, TableSpec, Value, ValueFormat,
};
use odp_geo::spatial::NO_MATCH;
use odp_geo::{Reprojector, SpatialFeatureCache, SpatialLookup};

/// Reference features and the cache used by spatial-id columns
pub struct SpatialContext<'a> {
    pub lookup: &'a SpatialLookup,
    pub cache: &'a mut SpatialFeatureCache,
}

/// Everything a transform needs besides the dataset and its table description
pub struct TransformContext<'a> {
    pub coercion: CoercionPolicy,
    pub spatial: Option<SpatialContext<'a>>,
}

impl<'a> TransformContext<'a> {
    pub fn new(coercion: CoercionPolicy) -> Self {
        Self { coercion, spatial: None }
    }

    pub fn with_spatial(
        mut self,
        lookup: &'a SpatialLookup,
        cache: &'a mut SpatialFeatureCache,
    ) -> Self {
        self.spatial = Some(SpatialContext { lookup, cache });
        self
    }
}

impl Default for TransformContext<'_> {
    fn default() -> Self {
        Self::new(CoercionPolicy::default())
    }
}

fn missing(column: &str, operation: &str) -> TransformError {
    TransformError::MissingColumn { column: column.to_string(), operation: operation.to_string() }
}

fn input_column<'d>(
    dataset: &'d Dataset,
    column: &str,
    operation: &str,
) -> Result<&'d Column, TransformError> {
    dataset.column(column).ok_or_else(|| missing(column, operation))
}

/// Transform a dataset according to its table spec
pub fn transform(
    mut dataset: Dataset,
    spec: &TableSpec,
    ctx: &mut TransformContext<'_>,
) -> Result<Dataset, TransformError> {
    let columns = &spec.columns;

    clean::prepare(&mut dataset, spec);
    coerce_types(&mut dataset, columns, ctx.coercion)?;
    apply_literals(&mut dataset, columns)?;
    apply_coordinates(&mut dataset, columns, Axis::Lon)?;
    apply_coordinates(&mut dataset, columns, Axis::Lat)?;
    apply_spatial_ids(&mut dataset, columns, ctx)?;
    apply_concat(&mut dataset, columns)?;
    apply_split(&mut dataset, columns)?;
    apply_filters(&mut dataset, &spec.filters)?;
    apply_copy(&mut dataset, columns)?;
    apply_zero_pad(&mut dataset, columns);
    apply_left_strip(&mut dataset, columns);
    apply_truncation(&mut dataset, columns);

    let mut dataset = aggregate(dataset, &spec.aggregation)?;

    apply_copy(&mut dataset, columns)?;
    apply_zero_pad(&mut dataset, columns);
    apply_fraction(&mut dataset, columns)?;
    apply_mapping(&mut dataset, columns)?;
    apply_value_formats(&mut dataset, columns);
    prune(&mut dataset, columns);
    rename(&mut dataset, columns);
    clean::finish(&mut dataset, spec);
    ensure_id(&mut dataset)?;

    tracing::debug!(
        "Transformed dataset has {} rows and {} columns",
        dataset.row_count(),
        dataset.column_count()
    );

    Ok(dataset)
}

fn coerce_types(
    dataset: &mut Dataset,
    columns: &[ColumnSpec],
    policy: CoercionPolicy,
) -> Result<(), TransformError> {
    for spec in columns {
        let Some(target) = spec.data_type else {
            continue;
        };
        let Some(column) = dataset.column_mut(&spec.name) else {
            continue;
        };

        let mut failed = 0;
        for value in &mut column.values {
            match value.coerce(target) {
                Some(coerced) => *value = coerced,
                None => match policy {
                    CoercionPolicy::Strict => {
                        return Err(TransformError::Coercion {
                            column: spec.name.clone(),
                            value: value.to_string(),
                            target: target.to_string(),
                        });
                    }
                    CoercionPolicy::Lenient => failed += 1,
                },
            }
        }

        if failed > 0 {
            tracing::debug!(
                "Kept {} values of column '{}' that do not coerce to {}",
                failed,
                spec.name,
                target
            );
        }
    }
    Ok(())
}

fn apply_literals(dataset: &mut Dataset, columns: &[ColumnSpec]) -> Result<(), TransformError> {
    for spec in columns {
        if let Some(Derive::Literal { value }) = &spec.derive {
            let rows = dataset.row_count();
            dataset.set_column(Column::repeat(spec.name.clone(), value.clone(), rows))?;
        }
    }
    Ok(())
}

fn apply_coordinates(
    dataset: &mut Dataset,
    columns: &[ColumnSpec],
    axis: Axis,
) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::Coordinate { lon_column, lat_column, source_crs, target_crs, axis: a }) =
            &spec.derive
        else {
            continue;
        };
        if *a != axis {
            continue;
        }

        let reprojector = Reprojector::new(source_crs, target_crs).map_err(|source| {
            TransformError::InvalidProjection { column: spec.name.clone(), source }
        })?;

        let lons = input_column(dataset, lon_column, "coordinate")?;
        let lats = input_column(dataset, lat_column, "coordinate")?;

        let mut values = Vec::with_capacity(dataset.row_count());
        for (row, (lon, lat)) in lons.values.iter().zip(&lats.values).enumerate() {
            let x = lon.as_f64().unwrap_or(f64::NAN);
            let y = lat.as_f64().unwrap_or(f64::NAN);
            let (tx, ty) = reprojector.reproject_point(x, y).map_err(|source| {
                TransformError::Projection { column: spec.name.clone(), row, source }
            })?;
            values.push(Value::Float(match axis {
                Axis::Lon => tx,
                Axis::Lat => ty,
            }));
        }

        tracing::debug!(
            "Reprojected column '{}' from {} to {}",
            spec.name,
            source_crs,
            target_crs
        );
        dataset.set_column(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_spatial_ids(
    dataset: &mut Dataset,
    columns: &[ColumnSpec],
    ctx: &mut TransformContext<'_>,
) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::SpatialId { lat_column, lon_column }) = &spec.derive else {
            continue;
        };
        let Some(spatial) = ctx.spatial.as_mut() else {
            return Err(TransformError::MissingSpatialContext { column: spec.name.clone() });
        };

        let lats = input_column(dataset, lat_column, "spatial_id")?;
        let lons = input_column(dataset, lon_column, "spatial_id")?;

        let mut values = Vec::with_capacity(dataset.row_count());
        for (lat, lon) in lats.values.iter().zip(&lons.values) {
            let id = match (lat.as_f64(), lon.as_f64()) {
                (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                    spatial.lookup.resolve(lat, lon, spatial.cache)?
                }
                _ => NO_MATCH.to_string(),
            };
            values.push(Value::Str(id));
        }

        tracing::debug!(
            "Resolved {} points for column '{}', {} geometry scans so far",
            values.len(),
            spec.name,
            spatial.lookup.scan_count()
        );
        dataset.set_column(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_concat(dataset: &mut Dataset, columns: &[ColumnSpec]) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::Concat { columns: sources, delimiter }) = &spec.derive else {
            continue;
        };

        let parts = sources
            .iter()
            .map(|name| input_column(dataset, name, "concat"))
            .collect::<Result<Vec<_>, _>>()?;

        let values = (0..dataset.row_count())
            .map(|row| {
                let joined: Vec<String> =
                    parts.iter().map(|c| c.values[row].to_string()).collect();
                Value::Str(joined.join(delimiter))
            })
            .collect();

        dataset.insert_first(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_split(dataset: &mut Dataset, columns: &[ColumnSpec]) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::Split { column, first_n, last_n }) = &spec.derive else {
            continue;
        };

        let values = input_column(dataset, column, "split")?
            .values
            .iter()
            .map(|v| match v {
                Value::Null => Value::Null,
                other => Value::Str(slice_chars(&other.to_string(), *last_n, *first_n)),
            })
            .collect();

        dataset.set_column(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_copy(dataset: &mut Dataset, columns: &[ColumnSpec]) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::Copy { column }) = &spec.derive else {
            continue;
        };
        let values = input_column(dataset, column, "copy")?.values.clone();
        dataset.insert_first(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_zero_pad(dataset: &mut Dataset, columns: &[ColumnSpec]) {
    for spec in columns {
        let Some(width) = spec.zero_pad else {
            continue;
        };
        if let Some(column) = dataset.column_mut(&spec.name) {
            for value in column.values.iter_mut().filter(|v| !v.is_missing()) {
                *value = Value::Str(zero_pad(&value.to_string(), width));
            }
        }
    }
}

fn apply_left_strip(dataset: &mut Dataset, columns: &[ColumnSpec]) {
    for spec in columns {
        let Some(chars) = &spec.left_strip else {
            continue;
        };
        if let Some(column) = dataset.column_mut(&spec.name) {
            for value in column.values.iter_mut().filter(|v| !v.is_missing()) {
                let text = value.to_string();
                *value = Value::str(left_strip(&text, chars));
            }
        }
    }
}

fn apply_truncation(dataset: &mut Dataset, columns: &[ColumnSpec]) {
    for spec in columns {
        let first = spec.first.filter(|n| *n > 0);
        let last = spec.last.filter(|n| *n > 0);
        if first.is_none() && last.is_none() {
            continue;
        }
        let Some(column) = dataset.column_mut(&spec.name) else {
            continue;
        };

        for value in column.values.iter_mut().filter(|v| !v.is_missing()) {
            let mut text = value.to_string();
            if let Some(count) = first {
                text = slice_chars(&text, None, Some(count as i64));
            }
            if let Some(count) = last {
                text = last_chars(&text, count);
            }
            *value = Value::Str(text);
        }
    }
}

fn apply_fraction(dataset: &mut Dataset, columns: &[ColumnSpec]) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::Fraction { numerator, denominator, decimals }) = &spec.derive else {
            continue;
        };

        let nums = input_column(dataset, numerator, "fraction")?;
        let dens = input_column(dataset, denominator, "fraction")?;

        let values = nums
            .values
            .iter()
            .zip(&dens.values)
            .map(|(n, d)| Value::Float(percentage(n.as_f64(), d.as_f64(), *decimals)))
            .collect();

        dataset.set_column(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_mapping(dataset: &mut Dataset, columns: &[ColumnSpec]) -> Result<(), TransformError> {
    for spec in columns {
        let Some(Derive::Mapping { key, table, default }) = &spec.derive else {
            continue;
        };

        let keys = input_column(dataset, key, "mapping")?;
        let values = keys
            .values
            .iter()
            .map(|k| {
                let rendered = k.to_string();
                table
                    .get(&rendered)
                    .or(default.as_ref())
                    .cloned()
                    .ok_or_else(|| TransformError::MissingMappingKey {
                        column: spec.name.clone(),
                        key: rendered,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        dataset.insert_first(Column::new(spec.name.clone(), values))?;
    }
    Ok(())
}

fn apply_value_formats(dataset: &mut Dataset, columns: &[ColumnSpec]) {
    for spec in columns {
        let Some(format) = spec.format else {
            continue;
        };
        if let Some(column) = dataset.column_mut(&spec.name) {
            for value in column.values.iter_mut().filter(|v| !v.is_missing()) {
                let text = value.to_string();
                *value = Value::Str(match format {
                    ValueFormat::PhoneNumber => phone_number(&text),
                    ValueFormat::Coordinate => coordinate_text(&text),
                });
            }
        }
    }
}

fn prune(dataset: &mut Dataset, columns: &[ColumnSpec]) {
    let keep: Vec<&str> =
        columns.iter().filter(|c| !c.remove).map(|c| c.name.as_str()).collect();
    dataset.select(&keep);
}

fn rename(dataset: &mut Dataset, columns: &[ColumnSpec]) {
    for spec in columns.iter().filter(|c| !c.remove) {
        if let Some(to) = &spec.rename {
            dataset.rename_column(&spec.name, to);
        }
    }
}

fn ensure_id(dataset: &mut Dataset) -> Result<(), TransformError> {
    if !dataset.has_column("id") {
        let rows = dataset.row_count();
        dataset.set_column(Column::repeat("id", Value::Int(0), rows))?;
    }
    dataset.move_first("id");
    Ok(())
}
