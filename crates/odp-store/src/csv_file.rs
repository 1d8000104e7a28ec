//! CSV file backend for the spatial feature cache.
//!
//! The file has a header row and two columns, `key,feature_id`. Files written
//! by earlier pipeline versions use `latlon,geojson_feature_id` and are read
//! as-is. New rows follow the column order of the existing header.

use odp_core::error::CacheError;
use odp_core::ports::{CacheEntry, FeatureCacheStore};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 2] = ["key", "feature_id"];
const LEGACY_HEADER: [&str; 2] = ["latlon", "geojson_feature_id"];

/// Column layout of a cache file that already has a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    width: usize,
    key_col: usize,
    id_col: usize,
    ends_with_newline: bool,
}

/// Append-only CSV cache file
#[derive(Debug, Clone)]
pub struct CsvCacheStore {
    path: PathBuf,
}

impl CsvCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, reason: impl ToString) -> CacheError {
        CacheError::Read { path: self.path.clone(), reason: reason.to_string() }
    }

    fn write_error(&self, reason: impl ToString) -> CacheError {
        CacheError::Write { path: self.path.clone(), reason: reason.to_string() }
    }

    fn malformed(&self, line: u64, reason: impl ToString) -> CacheError {
        CacheError::Malformed { path: self.path.clone(), line, reason: reason.to_string() }
    }

    /// Column positions of key and feature id in a header row
    fn header_columns(&self, headers: &csv::StringRecord) -> Result<(usize, usize), CacheError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        for [key, id] in [HEADER, LEGACY_HEADER] {
            if let (Some(k), Some(i)) = (find(key), find(id)) {
                return Ok((k, i));
            }
        }

        Err(self.malformed(
            1,
            format!(
                "expected header '{}' or '{}', found '{}'",
                HEADER.join(","),
                LEGACY_HEADER.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        ))
    }

    /// Layout of the existing file, `None` when there is no header yet
    fn layout(&self) -> Result<Option<Layout>, CacheError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.read_error(e)),
        };

        let len = file.metadata().map_err(|e| self.read_error(e))?.len();
        if len == 0 {
            return Ok(None);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1)).map_err(|e| self.read_error(e))?;
        file.read_exact(&mut last).map_err(|e| self.read_error(e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| self.read_error(e))?;

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader.headers().map_err(|e| self.read_error(e))?.clone();
        if headers.is_empty() {
            return Ok(None);
        }
        let (key_col, id_col) = self.header_columns(&headers)?;

        Ok(Some(Layout {
            width: headers.len(),
            key_col,
            id_col,
            ends_with_newline: last[0] == b'\n',
        }))
    }
}

impl FeatureCacheStore for CsvCacheStore {
    fn load(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No feature cache at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.read_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = reader.headers().map_err(|e| self.read_error(e))?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let (key_col, id_col) = self.header_columns(&headers)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                let line = e.position().map_or(0, |p| p.line());
                self.malformed(line, e)
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let key = record.get(key_col).map(str::trim).unwrap_or_default();
            let feature_id = record.get(id_col).map(str::trim).unwrap_or_default();
            if key.is_empty() || feature_id.is_empty() {
                return Err(self.malformed(line, "empty key or feature id"));
            }
            entries.push(CacheEntry::new(key, feature_id));
        }

        tracing::debug!("Read {} cache rows from {}", entries.len(), self.path.display());
        Ok(entries)
    }

    fn append(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let layout = self.layout()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;

        if layout.is_some_and(|l| !l.ends_with_newline) {
            file.write_all(b"\n").map_err(|e| self.write_error(e))?;
        }

        {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(&mut file);
            let record = match layout {
                Some(layout) => {
                    let mut fields = vec![""; layout.width];
                    fields[layout.key_col] = entry.key.as_str();
                    fields[layout.id_col] = entry.feature_id.as_str();
                    fields
                }
                None => {
                    writer.write_record(HEADER).map_err(|e| self.write_error(e))?;
                    vec![entry.key.as_str(), entry.feature_id.as_str()]
                }
            };
            writer.write_record(&record).map_err(|e| self.write_error(e))?;
            writer.flush().map_err(|e| self.write_error(e))?;
        }

        file.sync_data().map_err(|e| self.write_error(e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
