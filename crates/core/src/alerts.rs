//! Alert classifier.
//!
//! Maps a metric value onto OK / WARNING / ALERT using strict `>`
//! comparisons against a [`ThresholdPair`]. The pair actually used is
//! echoed in the alert so consumers can draw threshold lines without
//! re-reading the configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kpi::KpiReport;
use crate::stats::round_to;
use crate::thresholds::{ThresholdPair, Thresholds};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Alert,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Alert => "ALERT",
        })
    }
}

/// Metrics that carry alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "scrap_rate")]
    ScrapRate,
    #[serde(rename = "downtime_event_sec")]
    DowntimeEventSec,
    #[serde(rename = "cycle_time_p95_sec")]
    CycleTimeP95Sec,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::ScrapRate,
        Metric::DowntimeEventSec,
        Metric::CycleTimeP95Sec,
    ];

    /// Key used in the threshold file and in alert payloads.
    pub fn name(self) -> &'static str {
        match self {
            Metric::ScrapRate => "scrap_rate",
            Metric::DowntimeEventSec => "downtime_event_sec",
            Metric::CycleTimeP95Sec => "cycle_time_p95_sec",
        }
    }

    /// Built-in pair used when configuration is absent or malformed.
    pub fn default_thresholds(self) -> ThresholdPair {
        match self {
            Metric::ScrapRate => ThresholdPair::new(0.08, 0.10),
            Metric::DowntimeEventSec => ThresholdPair::new(300.0, 1800.0),
            Metric::CycleTimeP95Sec => ThresholdPair::new(120.0, 150.0),
        }
    }

    fn decimals(self) -> i32 {
        match self {
            Metric::ScrapRate => 4,
            Metric::DowntimeEventSec | Metric::CycleTimeP95Sec => 1,
        }
    }
}

/// One classified metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: Metric,
    pub value: f64,
    pub level: Severity,
    pub thresholds: ThresholdPair,
}

/// Resolve the pair for `metric`, falling back to its default when no
/// configuration is given or the entry is unusable.
pub fn resolve_thresholds(thresholds: Option<&Thresholds>, metric: Metric) -> ThresholdPair {
    let default = metric.default_thresholds();
    thresholds.map_or(default, |t| t.pair_for(metric.name(), default))
}

pub fn classify(value: f64, pair: ThresholdPair) -> Severity {
    if value > pair.alert_gt {
        Severity::Alert
    } else if value > pair.warning_gt {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

pub fn evaluate(metric: Metric, value: f64, thresholds: Option<&Thresholds>) -> Alert {
    let pair = resolve_thresholds(thresholds, metric);
    Alert {
        metric,
        value: round_to(value, metric.decimals()),
        level: classify(value, pair),
        thresholds: pair,
    }
}

pub fn alert_scrap_rate(scrap_rate: f64, thresholds: Option<&Thresholds>) -> Alert {
    evaluate(Metric::ScrapRate, scrap_rate, thresholds)
}

/// Classify the longest single downtime event.
pub fn alert_long_downtime(downtime_sec: f64, thresholds: Option<&Thresholds>) -> Alert {
    evaluate(Metric::DowntimeEventSec, downtime_sec, thresholds)
}

pub fn alert_cycle_time_p95(p95_sec: f64, thresholds: Option<&Thresholds>) -> Alert {
    evaluate(Metric::CycleTimeP95Sec, p95_sec, thresholds)
}

/// The three standard alerts for a KPI report, in a fixed order.
///
/// Levels come from the unrounded figures; only the echoed `value` is
/// rounded.
pub fn evaluate_report(report: &KpiReport, thresholds: Option<&Thresholds>) -> Vec<Alert> {
    vec![
        alert_scrap_rate(report.snapshot.scrap_rate, thresholds),
        alert_long_downtime(report.downtime_for_alert(), thresholds),
        alert_cycle_time_p95(report.cycle_p95_for_alert(), thresholds),
    ]
}
