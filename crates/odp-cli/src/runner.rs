//! Bookkeeping shared by the pipeline commands: which files to process, and
//! what happened to each of them.

use crate::output::OutputWriter;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use odp_core::models::{FileSpec, TransformationSpec};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::Tabled;

/// Load a transformation file
pub fn load_transformation(path: &Path) -> Result<TransformationSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transformation file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse transformation file {}", path.display()))
}

/// One declared output file with its resolved paths
#[derive(Debug, Clone)]
pub struct FileJob<'a> {
    pub port: &'a str,
    pub file: &'a FileSpec,
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Every declared output in declaration order. Sources are looked up under
/// `<source>/<port>/`, targets written under `<results>/<port>/`.
pub fn file_jobs<'a>(
    spec: &'a TransformationSpec,
    source_dir: &Path,
    results_dir: &Path,
) -> Vec<FileJob<'a>> {
    spec.input_ports
        .iter()
        .flat_map(|port| port.files.iter().map(move |file| (port.id.as_str(), file)))
        .map(|(port, file)| FileJob {
            port,
            file,
            source: source_dir.join(port).join(&file.source_file_name),
            target: results_dir.join(port).join(&file.target_file_name),
        })
        .collect()
}

/// Outcome of a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    AlreadyExists,
    Converted,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Files")]
    files: usize,
}

/// Summary of a run over all declared files
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files: Vec<FileResult>,
}

impl RunSummary {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            started_at: Utc::now(),
            finished_at: None,
            files: Vec::new(),
        }
    }

    pub fn add_already_exists(&mut self, path: &Path) {
        self.files.push(FileResult {
            path: path.to_path_buf(),
            status: FileStatus::AlreadyExists,
            error: None,
        });
    }

    pub fn add_converted(&mut self, path: &Path) {
        self.files.push(FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Converted,
            error: None,
        });
    }

    pub fn add_failure(&mut self, path: &Path, error: &anyhow::Error) {
        self.files.push(FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            error: Some(format!("{:#}", error)),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.count(FileStatus::Failed) == 0
    }

    /// Display summary to output
    pub fn display(&self, output: &OutputWriter) -> Result<()> {
        if output.is_json() {
            return output.result(self);
        }

        output.section(format!("{} summary", self.command));
        output.kv("Started", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if let Some(finished) = self.finished_at {
            let elapsed = finished - self.started_at;
            output.kv("Duration", format!("{} ms", elapsed.num_milliseconds()));
        }

        output.table(vec![
            SummaryRow { outcome: "already exists", files: self.count(FileStatus::AlreadyExists) },
            SummaryRow { outcome: "converted", files: self.count(FileStatus::Converted) },
            SummaryRow { outcome: "failed", files: self.count(FileStatus::Failed) },
        ]);

        for failure in self.files.iter().filter(|f| f.status == FileStatus::Failed) {
            output.error(format!(
                "{} - {}",
                failure.path.display(),
                failure.error.as_deref().unwrap_or("unknown error")
            ));
        }

        Ok(())
    }
}
