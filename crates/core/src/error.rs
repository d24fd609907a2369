use std::path::PathBuf;

/// Errors from loading the threshold configuration.
///
/// None of these are fatal to the pipeline: callers decide whether to fall
/// back to the built-in defaults.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("threshold config not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read threshold config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML.
    #[error("failed to load threshold config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Valid YAML whose top level is not a mapping.
    #[error("threshold config must be a YAML mapping: {}", path.display())]
    NotMapping { path: PathBuf },
}
