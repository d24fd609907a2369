//! Typed event and quality-check records.
//!
//! Raw rows arrive loosely typed (every field an optional string, straight
//! from CSV). The cleaner is the only place that turns a raw row into a
//! typed [`Event`] or [`QualityCheck`]; everything downstream works on the
//! typed form.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::timestamp::format_timestamp;

/// Column names of an event table, in file order.
pub const EVENT_COLUMNS: [&str; 7] = [
    "ts",
    "cell_id",
    "robot_id",
    "job_id",
    "program_id",
    "event_type",
    "error_code",
];

/// Column names of a quality-check table, in file order.
pub const QUALITY_COLUMNS: [&str; 7] = [
    "job_id",
    "cell_id",
    "robot_id",
    "program_id",
    "result",
    "reason",
    "rework_needed",
];

/// Robot event kinds accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    StartCycle,
    ArcOn,
    ArcOff,
    EndCycle,
    Error,
    Reset,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::StartCycle,
        EventType::ArcOn,
        EventType::ArcOff,
        EventType::EndCycle,
        EventType::Error,
        EventType::Reset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::StartCycle => "START_CYCLE",
            EventType::ArcOn => "ARC_ON",
            EventType::ArcOff => "ARC_OFF",
            EventType::EndCycle => "END_CYCLE",
            EventType::Error => "ERROR",
            EventType::Reset => "RESET",
        }
    }

    /// Exact, case-sensitive match against the allowed set.
    pub fn parse(value: &str) -> Option<EventType> {
        EventType::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityResult {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOK")]
    Nok,
}

impl QualityResult {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityResult::Ok => "OK",
            QualityResult::Nok => "NOK",
        }
    }

    /// Case-insensitive: `"nok"`, `"Nok"` and `"NOK"` all map to `Nok`.
    pub fn parse(value: &str) -> Option<QualityResult> {
        match value.to_uppercase().as_str() {
            "OK" => Some(QualityResult::Ok),
            "NOK" => Some(QualityResult::Nok),
            _ => None,
        }
    }
}

/// An event row as read from a file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    pub ts: Option<String>,
    pub cell_id: Option<String>,
    pub robot_id: Option<String>,
    pub job_id: Option<String>,
    pub program_id: Option<String>,
    pub event_type: Option<String>,
    pub error_code: Option<String>,
}

/// A validated robot event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub ts: OffsetDateTime,
    pub cell_id: String,
    pub robot_id: String,
    pub job_id: String,
    pub program_id: String,
    pub event_type: EventType,
    pub error_code: Option<String>,
}

/// Deduplication identity: all seven fields.
pub type EventIdentity<'a> = (
    OffsetDateTime,
    &'a str,
    &'a str,
    &'a str,
    &'a str,
    EventType,
    Option<&'a str>,
);

impl Event {
    pub fn identity(&self) -> EventIdentity<'_> {
        (
            self.ts,
            &self.cell_id,
            &self.robot_id,
            &self.job_id,
            &self.program_id,
            self.event_type,
            self.error_code.as_deref(),
        )
    }

    /// Render back into the staged-file row shape.
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            ts: Some(format_timestamp(self.ts)),
            cell_id: Some(self.cell_id.clone()),
            robot_id: Some(self.robot_id.clone()),
            job_id: Some(self.job_id.clone()),
            program_id: Some(self.program_id.clone()),
            event_type: Some(self.event_type.as_str().to_string()),
            error_code: self.error_code.clone(),
        }
    }
}

/// A quality-check row as read from a file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQualityCheck {
    pub job_id: Option<String>,
    pub cell_id: Option<String>,
    pub robot_id: Option<String>,
    pub program_id: Option<String>,
    pub result: Option<String>,
    pub reason: Option<String>,
    pub rework_needed: Option<String>,
}

/// A validated quality check, one per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityCheck {
    pub job_id: String,
    pub cell_id: String,
    pub robot_id: String,
    pub program_id: String,
    pub result: QualityResult,
    pub reason: Option<String>,
    pub rework_needed: Option<bool>,
}

impl QualityCheck {
    pub fn is_nok(&self) -> bool {
        self.result == QualityResult::Nok
    }

    pub fn to_raw(&self) -> RawQualityCheck {
        RawQualityCheck {
            job_id: Some(self.job_id.clone()),
            cell_id: Some(self.cell_id.clone()),
            robot_id: Some(self.robot_id.clone()),
            program_id: Some(self.program_id.clone()),
            result: Some(self.result.as_str().to_string()),
            reason: self.reason.clone(),
            rework_needed: self
                .rework_needed
                .map(|b| if b { "True" } else { "False" }.to_string()),
        }
    }
}

/// Rows plus the column names their source actually carried.
///
/// Typed rows cannot express "this column was never present", so the
/// header travels alongside them for consumers (drilldown) that degrade
/// when a column is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    pub columns: Vec<String>,
    pub rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(columns: Vec<String>, rows: Vec<R>) -> Self {
        Table { columns, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Table<RawEvent> {
    /// A raw event table carrying the full canonical header.
    pub fn events(rows: Vec<RawEvent>) -> Self {
        Table::new(EVENT_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
    }
}

impl Table<RawQualityCheck> {
    /// A raw quality table carrying the full canonical header.
    pub fn quality(rows: Vec<RawQualityCheck>) -> Self {
        Table::new(QUALITY_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_parse_is_exact() {
        assert_eq!(EventType::parse("ARC_ON"), Some(EventType::ArcOn));
        assert_eq!(EventType::parse("arc_on"), None);
        assert_eq!(EventType::parse("WELD"), None);
    }

    #[test]
    fn quality_result_parse_uppercases() {
        assert_eq!(QualityResult::parse("nok"), Some(QualityResult::Nok));
        assert_eq!(QualityResult::parse("Ok"), Some(QualityResult::Ok));
        assert_eq!(QualityResult::parse("maybe"), None);
    }

    #[test]
    fn table_tracks_columns() {
        let t = Table::new(vec!["ts".to_string()], Vec::<RawEvent>::new());
        assert!(t.has_column("ts"));
        assert!(!t.has_column("cell_id"));
        assert!(Table::events(vec![]).has_column("cell_id"));
    }
}
