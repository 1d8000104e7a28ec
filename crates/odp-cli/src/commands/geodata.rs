//! Geodata command implementation
//!
//! Each GeoJSON source goes through geometry repair, reprojection, bounding
//! boxes and property transforms. The source is always the input. Without
//! `--clean`, a target whose content already equals the converted source is
//! reported as already converted and not rewritten.

use super::RunOptions;
use crate::cli::RunArgs;
use crate::io::{geojson_bytes, read_geojson, write_bytes};
use crate::output::OutputWriter;
use crate::progress::{create_progress_bar, finish_error, finish_success};
use crate::runner::{file_jobs, load_transformation, FileJob, RunSummary};
use anyhow::{Context, Result};
use odp_core::config::LayeredConfig;
use odp_core::models::{Crs, ValidityMode};
use odp_engine::apply_properties;
use odp_geo::{add_bounding_boxes, repair_feature, reproject_collection};
use std::fs;

pub fn execute(
    args: &RunArgs,
    config: &LayeredConfig,
    options: RunOptions,
    output: &OutputWriter,
) -> Result<RunSummary> {
    let spec = load_transformation(&args.transformation)?;
    let jobs = file_jobs(&spec, &args.source, &args.results);
    let show_progress = !output.is_quiet() && !output.is_json();

    let mut summary = RunSummary::new("geodata");

    for job in &jobs {
        let target_crs = job.file.target_crs.as_ref().unwrap_or(&config.target_crs.value);

        match convert(job, config.geometry_validity.value, target_crs, options, show_progress) {
            Ok(true) => {
                tracing::info!("Wrote {}", job.target.display());
                summary.add_converted(&job.target);
                output.success(format!("Convert {}", job.file.target_file_name));
            }
            Ok(false) => {
                summary.add_already_exists(&job.target);
                output.success(format!("Already converted {}", job.file.target_file_name));
            }
            Err(e) => {
                tracing::debug!("Failed {}: {:#}", job.target.display(), e);
                summary.add_failure(&job.target, &e);
            }
        }
    }

    summary.finish();
    summary.display(output)?;

    Ok(summary)
}

/// Run all stages on one file. Returns whether the target was written.
fn convert(
    job: &FileJob<'_>,
    validity: ValidityMode,
    target_crs: &Crs,
    options: RunOptions,
    show_progress: bool,
) -> Result<bool> {
    let mut collection = read_geojson(&job.source)?;

    let pb = create_progress_bar(
        collection.features.len() as u64,
        &job.file.target_file_name,
        show_progress,
    );

    let mut repaired = false;
    for feature in &mut collection.features {
        match repair_feature(feature, validity) {
            Ok(changed) => repaired |= changed,
            Err(e) => {
                finish_error(&pb, &job.file.target_file_name);
                return Err(e)
                    .with_context(|| format!("Failed to repair {}", job.source.display()));
            }
        }
        pb.inc(1);
    }

    let reprojected = reproject_collection(&mut collection, target_crs, false)
        .with_context(|| {
            format!("Failed to reproject {} to {}", job.source.display(), target_crs)
        })?;

    let boxed = add_bounding_boxes(&mut collection, options.clean);

    let renamed = apply_properties(&mut collection, &job.file.properties)
        .with_context(|| format!("Failed to convert properties of {}", job.source.display()))?;

    tracing::debug!(
        "{}: repaired {}, reprojected {}, bounding boxes {}, properties {}",
        job.file.target_file_name,
        repaired,
        reprojected,
        boxed,
        renamed
    );

    let content = geojson_bytes(&collection)?;
    if !options.clean && fs::read(&job.target).is_ok_and(|existing| existing == content) {
        finish_success(&pb, &format!("{} unchanged", job.file.target_file_name));
        return Ok(false);
    }

    write_bytes(&job.target, &content)?;
    finish_success(&pb, &job.file.target_file_name);

    Ok(true)
}
