use std::path::PathBuf;

/// All errors that can be returned by the report store and table I/O.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV reader/writer failure.
    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A report could not be serialized to JSON.
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Moving a finished temp file into place failed.
    #[error("failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No file in `dir` matched the requested prefix.
    #[error("no files found in {} with pattern: {prefix}*{suffix}", dir.display())]
    NoMatchingFile {
        dir: PathBuf,
        prefix: String,
        suffix: String,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
