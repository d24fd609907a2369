//! Threshold provider.
//!
//! The threshold file is a YAML mapping from metric name to a pair of
//! limits:
//!
//! ```yaml
//! scrap_rate:
//!   warning_gt: 0.08
//!   alert_gt: 0.10
//! downtime_event_sec:
//!   warning_gt: 300
//!   alert_gt: 1800
//! ```
//!
//! Loading returns a `Result`; the default-substitution policy belongs to
//! the caller, which passes `Option<&Thresholds>` on to the classifiers.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConfigError;

/// Default location of the threshold file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/thresholds.yaml";

/// Warning and alert limits for one metric. Both are strict `>` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warning_gt: f64,
    pub alert_gt: f64,
}

impl ThresholdPair {
    pub const fn new(warning_gt: f64, alert_gt: f64) -> Self {
        ThresholdPair {
            warning_gt,
            alert_gt,
        }
    }
}

/// Parsed threshold configuration, keyed by metric name.
///
/// Entries are kept as raw YAML so that a malformed entry only affects its
/// own metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    metrics: BTreeMap<String, Value>,
}

impl Thresholds {
    /// Build from an already-parsed YAML document. Returns `None` unless the
    /// top level is a mapping.
    pub fn from_value(value: Value) -> Option<Thresholds> {
        let Value::Mapping(mapping) = value else {
            return None;
        };
        let metrics = mapping
            .into_iter()
            .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
            .collect();
        Some(Thresholds { metrics })
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.metrics.contains_key(metric)
    }

    /// Resolve the pair for `metric`.
    ///
    /// A missing key falls back to its default half. A value that is neither
    /// a number nor a numeric string makes the whole pair fall back.
    pub fn pair_for(&self, metric: &str, default: ThresholdPair) -> ThresholdPair {
        let Some(Value::Mapping(entry)) = self.metrics.get(metric) else {
            return default;
        };

        let warning = entry
            .get("warning_gt")
            .map_or(Some(default.warning_gt), numeric);
        let alert = entry.get("alert_gt").map_or(Some(default.alert_gt), numeric);

        match (warning, alert) {
            (Some(warning_gt), Some(alert_gt)) => ThresholdPair::new(warning_gt, alert_gt),
            _ => default,
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Load thresholds from a YAML file.
pub fn load_thresholds(path: &Path) -> Result<Thresholds, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Thresholds::from_value(value).ok_or_else(|| ConfigError::NotMapping {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DEFAULT: ThresholdPair = ThresholdPair::new(0.08, 0.10);

    fn parse(yaml: &str) -> Thresholds {
        Thresholds::from_value(serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    #[test]
    fn pair_from_config() {
        let t = parse("scrap_rate:\n  warning_gt: 0.2\n  alert_gt: 0.3\n");
        assert_eq!(t.pair_for("scrap_rate", DEFAULT), ThresholdPair::new(0.2, 0.3));
    }

    #[test]
    fn unknown_metric_uses_default() {
        let t = parse("scrap_rate:\n  warning_gt: 0.2\n  alert_gt: 0.3\n");
        assert_eq!(t.pair_for("downtime_event_sec", DEFAULT), DEFAULT);
    }

    #[test]
    fn non_numeric_value_falls_back_for_whole_pair() {
        let t = parse("scrap_rate:\n  warning_gt: bad\n  alert_gt: 0.5\n");
        assert_eq!(t.pair_for("scrap_rate", DEFAULT), DEFAULT);
    }

    #[test]
    fn numeric_strings_and_missing_half() {
        let t = parse("scrap_rate:\n  warning_gt: \"0.25\"\n");
        assert_eq!(t.pair_for("scrap_rate", DEFAULT), ThresholdPair::new(0.25, 0.10));
    }

    #[test]
    fn entry_that_is_not_a_mapping_uses_default() {
        let t = parse("scrap_rate: 0.5\n");
        assert!(t.contains("scrap_rate"));
        assert_eq!(t.pair_for("scrap_rate", DEFAULT), DEFAULT);
    }

    #[test]
    fn load_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thresholds.yaml");
        fs::write(
            &path,
            "scrap_rate:\n  warning_gt: 0.08\n  alert_gt: 0.10\ndowntime_event_sec:\n  warning_gt: 300\n  alert_gt: 1800\n",
        )
        .unwrap();

        let t = load_thresholds(&path).unwrap();
        assert_eq!(
            t.pair_for("downtime_event_sec", ThresholdPair::new(0.0, 0.0)),
            ThresholdPair::new(300.0, 1800.0)
        );
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_thresholds(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("threshold config not found"));
    }

    #[test]
    fn load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "scrap_rate: [1, 2").unwrap();
        let err = load_thresholds(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to load threshold config"));
    }

    #[test]
    fn load_non_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.yaml");
        fs::write(&path, "- 1\n- 2\n- 3\n").unwrap();
        let err = load_thresholds(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotMapping { .. }));
        assert!(err.to_string().contains("must be a YAML mapping"));
    }
}
