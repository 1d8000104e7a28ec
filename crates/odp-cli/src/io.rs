//! Reading and writing the files the runner works on

use anyhow::{Context, Result};
use odp_core::models::{Dataset, FeatureCollection};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Read a CSV file with a header row. Every cell is read as trimmed text.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let header: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read {}", path.display()))?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Dataset::from_records(&header, records)
        .with_context(|| format!("Invalid table in {}", path.display()))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Write a dataset as CSV, creating parent directories as needed
pub fn write_csv(path: &Path, dataset: &Dataset) -> Result<()> {
    create_parent(path)?;

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(dataset.column_names())?;
    for row in 0..dataset.row_count() {
        let cells = dataset.columns().iter().map(|c| c.values[row].to_string());
        writer.write_record(cells)?;
    }
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

pub fn read_geojson(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON in {}", path.display()))
}

/// Serialized form of a feature collection, as written by [`write_geojson`]
pub fn geojson_bytes(collection: &FeatureCollection) -> Result<Vec<u8>> {
    serde_json::to_vec(collection).context("Failed to serialize feature collection")
}

/// Write bytes to a file, creating parent directories as needed
pub fn write_bytes(path: &Path, content: &[u8]) -> Result<()> {
    create_parent(path)?;

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content).with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Write a feature collection, creating parent directories as needed
pub fn write_geojson(path: &Path, collection: &FeatureCollection) -> Result<()> {
    write_bytes(path, &geojson_bytes(collection)?)
}
