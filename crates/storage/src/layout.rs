use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::record::Stamp;
use crate::store::ReportStore;

/// File-name prefixes of the datasets moved between pipeline stages.
pub const RAW_EVENTS_PREFIX: &str = "robot_events_";
pub const RAW_QUALITY_PREFIX: &str = "quality_checks_";
pub const STAGED_EVENTS_PREFIX: &str = "robot_events_staged_";
pub const STAGED_QUALITY_PREFIX: &str = "quality_checks_staged_";

/// Directory layout of one pipeline workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub raw_dir: PathBuf,
    pub staged_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            raw_dir: PathBuf::from("data/raw"),
            staged_dir: PathBuf::from("data/staged"),
            reports_dir: PathBuf::from("data/reports"),
        }
    }
}

impl Layout {
    /// Create every directory that does not exist yet.
    pub fn ensure(&self) -> Result<(), StorageError> {
        for dir in [&self.raw_dir, &self.staged_dir, &self.reports_dir] {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        Ok(())
    }

    pub fn reports(&self) -> ReportStore {
        ReportStore::new(&self.reports_dir)
    }

    pub fn raw_paths(&self, stamp: &Stamp) -> (PathBuf, PathBuf) {
        stamped_pair(&self.raw_dir, RAW_EVENTS_PREFIX, RAW_QUALITY_PREFIX, stamp)
    }

    pub fn staged_paths(&self, stamp: &Stamp) -> (PathBuf, PathBuf) {
        stamped_pair(
            &self.staged_dir,
            STAGED_EVENTS_PREFIX,
            STAGED_QUALITY_PREFIX,
            stamp,
        )
    }
}

fn stamped_pair(dir: &Path, events: &str, quality: &str, stamp: &Stamp) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{}{}.csv", events, stamp)),
        dir.join(format!("{}{}.csv", quality, stamp)),
    )
}
