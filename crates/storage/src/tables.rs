//! CSV table I/O for raw and staged datasets.
//!
//! Reading is lenient: rows with the wrong number of fields are accepted,
//! columns are matched by header name, and a row that cannot be decoded at
//! all becomes an all-missing row so that the cleaner accounts for it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use weldline_core::{
    Event, QualityCheck, RawEvent, RawQualityCheck, Table, EVENT_COLUMNS, QUALITY_COLUMNS,
};

use crate::error::StorageError;

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> StorageError + '_ {
    move |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a CSV file into a table of raw rows, keeping its header.
pub fn read_table<R: DeserializeOwned + Default>(path: &Path) -> Result<Table<R>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(csv_err(path))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err(path))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<R>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(path = %path.display(), row = line, error = %e, "undecodable row kept as empty");
                rows.push(R::default());
            }
        }
    }

    info!(path = %path.display(), rows = rows.len(), "table loaded");
    Ok(Table::new(columns, rows))
}

pub fn read_events(path: &Path) -> Result<Table<RawEvent>, StorageError> {
    read_table(path)
}

pub fn read_quality(path: &Path) -> Result<Table<RawQualityCheck>, StorageError> {
    read_table(path)
}

/// Write rows under an explicit header. The header is written even when
/// there are no rows.
pub fn write_table<R: Serialize>(
    path: &Path,
    columns: &[&str],
    rows: impl IntoIterator<Item = R>,
) -> Result<usize, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err(path))?;
    writer.write_record(columns).map_err(csv_err(path))?;

    let mut written = 0;
    for row in rows {
        writer.serialize(row).map_err(csv_err(path))?;
        written += 1;
    }
    writer
        .flush()
        .map_err(|e| StorageError::io(path, e))?;

    info!(path = %path.display(), rows = written, "table written");
    Ok(written)
}

pub fn write_events(path: &Path, rows: &[RawEvent]) -> Result<usize, StorageError> {
    write_table(path, &EVENT_COLUMNS, rows)
}

pub fn write_quality(path: &Path, rows: &[RawQualityCheck]) -> Result<usize, StorageError> {
    write_table(path, &QUALITY_COLUMNS, rows)
}

/// Write cleaned events in the staged-file shape.
pub fn write_staged_events(path: &Path, events: &[Event]) -> Result<usize, StorageError> {
    write_table(path, &EVENT_COLUMNS, events.iter().map(Event::to_raw))
}

pub fn write_staged_quality(path: &Path, checks: &[QualityCheck]) -> Result<usize, StorageError> {
    write_table(path, &QUALITY_COLUMNS, checks.iter().map(QualityCheck::to_raw))
}

/// The lexicographically greatest file in `dir` named `<prefix>*<suffix>`.
///
/// With `YYYYMMDD_HHMMSS` stamps in the names this is the newest file.
pub fn pick_latest_file(dir: &Path, prefix: &str, suffix: &str) -> Result<PathBuf, StorageError> {
    latest_matching(dir, prefix, None, suffix)
}

/// Like [`pick_latest_file`], skipping names that start with `exclude`.
///
/// Raw and staged names share a stem (`robot_events_` vs
/// `robot_events_staged_`), so raw lookups in a shared directory exclude
/// the staged prefix.
pub fn pick_latest_file_excluding(
    dir: &Path,
    prefix: &str,
    exclude: &str,
    suffix: &str,
) -> Result<PathBuf, StorageError> {
    latest_matching(dir, prefix, Some(exclude), suffix)
}

fn latest_matching(
    dir: &Path,
    prefix: &str,
    exclude: Option<&str>,
    suffix: &str,
) -> Result<PathBuf, StorageError> {
    let no_match = || StorageError::NoMatchingFile {
        dir: dir.to_path_buf(),
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(no_match()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix) && name.ends_with(suffix))
        .filter(|name| exclude.map_or(true, |ex| !name.starts_with(ex)))
        .max()
        .map(|name| dir.join(name))
        .ok_or_else(no_match)
}
