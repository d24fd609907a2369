//! KPI engine.
//!
//! Computes cycle and arc-on time distributions, scrap rate and error-code
//! frequencies from any slice of cleaned events and quality checks (a whole
//! run, one cell, one robot).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::alerts::{evaluate_report, Alert};
use crate::downtime::{max_downtime_with, ResetPairing};
use crate::records::{Event, EventType, QualityCheck};
use crate::stats::{round_to, DistributionSummary};
use crate::thresholds::Thresholds;
use crate::timestamp::seconds_between;

/// Spans longer than this (seconds) are treated as implausible.
pub const MAX_SPAN_SECONDS: f64 = 3600.0;

/// How many error codes the report keeps.
pub const TOP_ERROR_CODES: usize = 10;

/// Error code occurrence counts, most frequent first.
///
/// Serialized as a JSON object whose key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodeCounts(pub Vec<(String, usize)>);

impl ErrorCodeCounts {
    pub fn get(&self, code: &str) -> Option<usize> {
        self.0.iter().find(|(c, _)| c == code).map(|(_, n)| *n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ErrorCodeCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, count) in &self.0 {
            map.serialize_entry(code, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ErrorCodeCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = ErrorCodeCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of error code to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((code, count)) = access.next_entry::<String, usize>()? {
                    entries.push((code, count));
                }
                Ok(ErrorCodeCounts(entries))
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// KPIs computed from one events/quality slice, before downtime and alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub jobs_total: usize,
    pub jobs_nok: usize,
    pub scrap_rate: f64,
    pub cycle_time_sec: DistributionSummary,
    pub arc_on_time_sec: DistributionSummary,
    pub top_error_codes: ErrorCodeCounts,
}

/// The full KPI report: snapshot plus downtime, alerting p95, and alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    #[serde(flatten)]
    pub snapshot: KpiSnapshot,
    pub max_downtime_event_sec: f64,
    /// Cycle-time p95 at 1 decimal; 0.0 when there are no cycles.
    pub cycle_time_p95_sec: f64,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// Longest downtime before display rounding. Absent on reports read
    /// back from JSON.
    #[serde(skip)]
    downtime_exact_sec: Option<f64>,
}

impl KpiReport {
    /// Snapshot plus downtime figures; `alerts` is left empty.
    pub fn compute(events: &[Event], quality: &[QualityCheck]) -> KpiReport {
        KpiReport::compute_with(events, quality, ResetPairing::default())
    }

    /// Like [`KpiReport::compute`], with an explicit ERROR/RESET pairing.
    pub fn compute_with(
        events: &[Event],
        quality: &[QualityCheck],
        pairing: ResetPairing,
    ) -> KpiReport {
        let snapshot = compute_kpis(events, quality);
        let max_downtime = max_downtime_with(events, pairing);
        let p95 = snapshot.cycle_time_sec.p95.unwrap_or(0.0);

        KpiReport {
            snapshot,
            max_downtime_event_sec: round_to(max_downtime, 1),
            cycle_time_p95_sec: round_to(p95, 1),
            alerts: Vec::new(),
            downtime_exact_sec: Some(max_downtime),
        }
    }

    /// Downtime the alert is classified on: the unrounded figure when known.
    pub fn downtime_for_alert(&self) -> f64 {
        self.downtime_exact_sec.unwrap_or(self.max_downtime_event_sec)
    }

    /// Cycle p95 the alert is classified on: the distribution's p95, which
    /// keeps more precision than `cycle_time_p95_sec`.
    pub fn cycle_p95_for_alert(&self) -> f64 {
        self.snapshot
            .cycle_time_sec
            .p95
            .unwrap_or(self.cycle_time_p95_sec)
    }

    /// Classify the report's metrics and attach the alerts.
    pub fn with_alerts(mut self, thresholds: Option<&Thresholds>) -> KpiReport {
        self.alerts = evaluate_report(&self, thresholds);
        self
    }
}

type JobKey<'a> = (&'a str, &'a str, &'a str, &'a str);

fn job_key(event: &Event) -> JobKey<'_> {
    (
        event.cell_id.as_str(),
        event.robot_id.as_str(),
        event.job_id.as_str(),
        event.program_id.as_str(),
    )
}

/// Per-job span from the earliest `open` event to the latest `close` event.
///
/// Jobs missing either side are skipped, as are spans outside
/// `[0, MAX_SPAN_SECONDS]`.
pub fn span_samples(events: &[Event], open: EventType, close: EventType) -> Vec<f64> {
    let mut spans: BTreeMap<JobKey<'_>, (Option<OffsetDateTime>, Option<OffsetDateTime>)> =
        BTreeMap::new();

    for event in events {
        if event.event_type == open {
            let entry = spans.entry(job_key(event)).or_default();
            entry.0 = Some(entry.0.map_or(event.ts, |t| t.min(event.ts)));
        } else if event.event_type == close {
            let entry = spans.entry(job_key(event)).or_default();
            entry.1 = Some(entry.1.map_or(event.ts, |t| t.max(event.ts)));
        }
    }

    spans
        .into_values()
        .filter_map(|span| match span {
            (Some(start), Some(end)) => Some(seconds_between(start, end)),
            _ => None,
        })
        .filter(|dt| (0.0..=MAX_SPAN_SECONDS).contains(dt))
        .collect()
}

/// Count error codes on ERROR events and keep the most frequent ones.
///
/// Ties keep first-seen order.
pub fn top_error_codes(events: &[Event], limit: usize) -> ErrorCodeCounts {
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for event in events {
        if event.event_type != EventType::Error {
            continue;
        }
        let Some(code) = event.error_code.as_deref() else {
            continue;
        };
        match index.get(code) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(code, order.len());
                order.push((code, 1));
            }
        }
    }

    order.sort_by(|a, b| b.1.cmp(&a.1));
    ErrorCodeCounts(
        order
            .into_iter()
            .take(limit)
            .map(|(code, n)| (code.to_string(), n))
            .collect(),
    )
}

/// Compute the KPI snapshot for the given slice.
pub fn compute_kpis(events: &[Event], quality: &[QualityCheck]) -> KpiSnapshot {
    let cycle = span_samples(events, EventType::StartCycle, EventType::EndCycle);
    let arc = span_samples(events, EventType::ArcOn, EventType::ArcOff);

    let jobs_total = quality.len();
    let jobs_nok = quality.iter().filter(|q| q.is_nok()).count();
    let scrap_rate = if jobs_total > 0 {
        jobs_nok as f64 / jobs_total as f64
    } else {
        0.0
    };

    KpiSnapshot {
        jobs_total,
        jobs_nok,
        scrap_rate: round_to(scrap_rate, 4),
        cycle_time_sec: DistributionSummary::from_samples(&cycle),
        arc_on_time_sec: DistributionSummary::from_samples(&arc),
        top_error_codes: top_error_codes(events, TOP_ERROR_CODES),
    }
}
