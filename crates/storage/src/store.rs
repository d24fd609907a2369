//! Filesystem report store.
//!
//! Each report is written twice under the reports directory:
//!
//! - `<kind>_report_<YYYYMMDD_HHMMSS>.json`: an immutable snapshot. A
//!   second write within the same second gets a `_1`, `_2`, ... suffix
//!   instead of overwriting.
//! - `<kind>_report_latest.json`: overwritten on every write.
//!
//! Both go through a temp file in the same directory. Snapshots are
//! persisted without clobbering; the latest pointer is renamed over the old
//! one, so readers never see a half-written file. Concurrent writers are
//! not coordinated: the last rename wins.
//!
//! Reads are null-safe. A missing or unparseable latest pointer falls back
//! to the newest snapshot, and if that fails too the report is absent.
//! Consumers that must tolerate partially-populated reports read into
//! `serde_json::Value`, which accepts any well-formed JSON.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::record::{LoadedReport, ReportKind, SnapshotName, Stamp, WrittenReport};

/// Give up looking for a free snapshot name after this many suffixes.
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Report store rooted at a directory.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ReportStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn latest_path(&self, kind: ReportKind) -> PathBuf {
        self.root.join(kind.latest_file_name())
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))
    }

    fn temp_with(&self, body: &[u8]) -> Result<NamedTempFile, StorageError> {
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        tmp.write_all(body)
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.flush().map_err(|e| StorageError::io(tmp.path(), e))?;
        Ok(tmp)
    }

    /// Write `report` as a new snapshot stamped now, and as the latest.
    pub fn write<T: Serialize>(
        &self,
        kind: ReportKind,
        report: &T,
    ) -> Result<WrittenReport, StorageError> {
        self.write_stamped(kind, report, &Stamp::now())
    }

    /// Write `report` as a snapshot with the given stamp, and as the latest.
    pub fn write_stamped<T: Serialize>(
        &self,
        kind: ReportKind,
        report: &T,
        stamp: &Stamp,
    ) -> Result<WrittenReport, StorageError> {
        self.ensure_root()?;
        let body = serde_json::to_string_pretty(report)?;

        let snapshot = self.persist_snapshot(kind, stamp, body.as_bytes())?;

        let latest = self.latest_path(kind);
        self.temp_with(body.as_bytes())?
            .persist(&latest)
            .map_err(|e| StorageError::Persist {
                path: latest.clone(),
                source: e.error,
            })?;

        info!(kind = %kind, snapshot = %snapshot.display(), "report written");
        Ok(WrittenReport { snapshot, latest })
    }

    fn persist_snapshot(
        &self,
        kind: ReportKind,
        stamp: &Stamp,
        body: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let mut tmp = self.temp_with(body)?;
        for suffix in 0..MAX_COLLISION_SUFFIX {
            let name = SnapshotName {
                stamp: stamp.clone(),
                suffix,
            };
            let path = self.root.join(name.file_name(kind));
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "snapshot name taken, trying next suffix");
                    tmp = e.file;
                }
                Err(e) => {
                    return Err(StorageError::Persist {
                        path,
                        source: e.error,
                    })
                }
            }
        }
        Err(StorageError::Persist {
            path: self.root.join(
                SnapshotName {
                    stamp: stamp.clone(),
                    suffix: MAX_COLLISION_SUFFIX,
                }
                .file_name(kind),
            ),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "snapshot suffixes exhausted"),
        })
    }

    /// All snapshots of `kind`, oldest first. A missing directory is empty.
    pub fn snapshots(&self, kind: ReportKind) -> Result<Vec<SnapshotName>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };

        let mut names: Vec<SnapshotName> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let file_name = entry.file_name();
                SnapshotName::parse(kind, file_name.to_str()?)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// The newest snapshot, derived from file names rather than the latest
    /// pointer.
    pub fn latest_snapshot(&self, kind: ReportKind) -> Result<Option<PathBuf>, StorageError> {
        Ok(self
            .snapshots(kind)?
            .pop()
            .map(|name| self.root.join(name.file_name(kind))))
    }

    /// Read the most recent report of `kind`, or `None` if there is no
    /// readable one.
    pub fn read_latest<T: DeserializeOwned>(&self, kind: ReportKind) -> Option<LoadedReport<T>> {
        if let Some(loaded) = read_json(&self.latest_path(kind)) {
            return Some(loaded);
        }

        match self.latest_snapshot(kind) {
            Ok(Some(path)) => read_json(&path),
            Ok(None) => None,
            Err(e) => {
                warn!(kind = %kind, error = %e, "could not list report snapshots");
                None
            }
        }
    }
}

/// Read and parse one JSON report; absent or corrupt files yield `None`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<LoadedReport<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "report unreadable");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(report) => Some(LoadedReport {
            report,
            source: path.to_path_buf(),
        }),
        Err(e) if e.is_data() => {
            warn!(path = %path.display(), error = %e, "report has an unexpected shape, ignoring");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "report is not valid JSON, ignoring");
            None
        }
    }
}
