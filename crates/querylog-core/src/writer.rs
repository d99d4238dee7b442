//! Merge batches into the daily JSON array file.
//!
//! Every write is a read-modify-write of the whole file. The sequence runs under
//! an exclusive advisory lock on a sibling `<file>.lock`, so writers in other
//! threads or processes wait instead of overwriting each other's batch. The new
//! array goes to a temporary file in the same directory which is renamed over
//! the log, so a failed write leaves the previous content in place.

use crate::aggregator::LogBatch;
use fs4::FileExt;
use querylog_common::Result;
use serde_json::Value;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct LogFileWriter {
    pretty: bool,
}

impl LogFileWriter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Append `batch` as the last element of the JSON array at `path`.
    ///
    /// Missing parent directories are created. Content that is not a JSON
    /// array is logged and replaced by a fresh array.
    pub fn write(&self, path: &Path, batch: &LogBatch) -> Result<()> {
        self.write_with(path, batch, |tmp, encoded| {
            tmp.write_all(encoded)?;
            tmp.as_file().sync_data()
        })
    }

    fn write_with<F>(&self, path: &Path, batch: &LogBatch, fill: F) -> Result<()>
    where
        F: FnOnce(&mut NamedTempFile, &[u8]) -> io::Result<()>,
    {
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path(path))?;

        lock.lock_exclusive()?;
        let result = self.merge_locked(dir, path, batch, fill);
        if let Err(e) = FileExt::unlock(&lock) {
            warn!("Failed to unlock query log {}: {}", path.display(), e);
        }
        result
    }

    fn merge_locked<F>(&self, dir: &Path, path: &Path, batch: &LogBatch, fill: F) -> Result<()>
    where
        F: FnOnce(&mut NamedTempFile, &[u8]) -> io::Result<()>,
    {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut entries = parse_entries(path, &raw);
        entries.push(serde_json::to_value(batch)?);

        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&entries)?
        } else {
            serde_json::to_vec(&entries)?
        };

        // dropped (and removed) on any error below
        let mut tmp = NamedTempFile::new_in(dir)?;
        fill(&mut tmp, &encoded)?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(
            "Appended batch of {} queries to {} ({} entries)",
            batch.total_query_count,
            path.display(),
            entries.len()
        );
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// Read back every entry of a query log file. Missing or blank files yield nothing.
pub fn read_entries(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read(path)?;
    if is_blank(&raw) {
        return Ok(Vec::new());
    }
    match serde_json::from_slice(&raw)? {
        Value::Array(entries) => Ok(entries),
        other => Ok(vec![other]),
    }
}

fn parse_entries(path: &Path, raw: &[u8]) -> Vec<Value> {
    if is_blank(raw) {
        return Vec::new();
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!(
                "Query log {} does not hold a JSON array, starting a fresh one",
                path.display()
            );
            Vec::new()
        }
        Err(e) => {
            warn!(
                "Query log {} is corrupt ({}), starting a fresh one",
                path.display(),
                e
            );
            Vec::new()
        }
    }
}

fn is_blank(raw: &[u8]) -> bool {
    raw.iter().all(u8::is_ascii_whitespace)
}
