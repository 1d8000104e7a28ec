//! Aggregate command implementation

use super::RunOptions;
use crate::cli::RunArgs;
use crate::io::{read_csv, read_geojson, write_csv};
use crate::output::OutputWriter;
use crate::progress::{create_progress_bar, finish_error, finish_success};
use crate::runner::{file_jobs, load_transformation, FileJob, RunSummary};
use anyhow::{Context, Result};
use odp_core::config::LayeredConfig;
use odp_core::models::CoercionPolicy;
use odp_engine::{transform, TransformContext};
use odp_geo::{SpatialFeatureCache, SpatialLookup};
use odp_store::CsvCacheStore;
use std::path::Path;

pub fn execute(
    args: &RunArgs,
    config: &LayeredConfig,
    options: RunOptions,
    output: &OutputWriter,
) -> Result<RunSummary> {
    let spec = load_transformation(&args.transformation)?;
    let jobs = file_jobs(&spec, &args.source, &args.results);
    let reference = args.reference.as_deref();

    // One cache per run, shared by every file with a spatial lookup
    let needs_cache = jobs.iter().any(|job| job.file.table.needs_spatial_lookup());
    let mut cache = match reference {
        Some(dir) if needs_cache => {
            let path = dir.join(&config.feature_cache.value);
            let cache = SpatialFeatureCache::open(Box::new(CsvCacheStore::new(&path)))
                .with_context(|| format!("Failed to open feature cache {}", path.display()))?;
            Some(cache)
        }
        _ => None,
    };

    let mut summary = RunSummary::new("aggregate");
    let pb = create_progress_bar(
        jobs.len() as u64,
        "Aggregating",
        !output.is_quiet() && !output.is_json(),
    );

    for job in &jobs {
        if !options.clean && job.target.exists() {
            summary.add_already_exists(&job.target);
            pb.suspend(|| output.success(format!("Already exists {}", job.file.target_file_name)));
            pb.inc(1);
            continue;
        }

        match convert(job, reference, config.coercion.value, cache.as_mut()) {
            Ok(rows) => {
                tracing::info!("Wrote {} rows to {}", rows, job.target.display());
                summary.add_converted(&job.target);
                pb.suspend(|| output.success(format!("Convert {}", job.file.target_file_name)));
            }
            Err(e) => {
                tracing::debug!("Failed {}: {:#}", job.target.display(), e);
                summary.add_failure(&job.target, &e);
            }
        }
        pb.inc(1);
    }

    if summary.all_succeeded() {
        finish_success(&pb, "Aggregation finished");
    } else {
        finish_error(&pb, "Aggregation finished with failures");
    }

    summary.finish();
    summary.display(output)?;

    Ok(summary)
}

/// Transform one file. Nothing is written when any stage fails.
fn convert(
    job: &FileJob<'_>,
    reference: Option<&Path>,
    coercion: CoercionPolicy,
    cache: Option<&mut SpatialFeatureCache>,
) -> Result<usize> {
    let dataset = read_csv(&job.source)?;
    let table = &job.file.table;

    let lookup = if table.needs_spatial_lookup() {
        let dir = reference.context("A spatial lookup needs --reference")?;
        let name = job.file.reference_file_name.as_deref().with_context(|| {
            format!("{} declares a spatial lookup without reference_file_name", job.port)
        })?;
        Some(SpatialLookup::new(&read_geojson(&dir.join(name))?))
    } else {
        None
    };

    let mut ctx = TransformContext::new(coercion);
    if let (Some(lookup), Some(cache)) = (lookup.as_ref(), cache) {
        ctx = ctx.with_spatial(lookup, cache);
    }

    let result = transform(dataset, table, &mut ctx)
        .with_context(|| format!("Failed to transform {}", job.source.display()))?;

    write_csv(&job.target, &result)?;

    Ok(result.row_count())
}
