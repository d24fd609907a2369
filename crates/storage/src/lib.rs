//! weldline-storage: flat-file persistence for the weldline pipeline.
//!
//! Reports are JSON snapshots in a reports directory (see [`ReportStore`]);
//! datasets are CSV files moved between the raw and staged directories
//! (see [`tables`]).

mod error;
mod layout;
mod record;
mod store;
pub mod tables;

pub use error::StorageError;
pub use layout::{
    Layout, RAW_EVENTS_PREFIX, RAW_QUALITY_PREFIX, STAGED_EVENTS_PREFIX, STAGED_QUALITY_PREFIX,
};
pub use record::{LoadedReport, ReportKind, SnapshotName, Stamp, WrittenReport};
pub use store::{read_json, ReportStore};
