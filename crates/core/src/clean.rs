//! Event/quality cleaner.
//!
//! Turns raw rows into typed records. Nothing here fails: a row that cannot
//! be validated becomes a [`Rejection`] carrying its index and the reason,
//! and the surviving rows are deduplicated and put in a deterministic order.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::records::{
    Event, EventType, QualityCheck, QualityResult, RawEvent, RawQualityCheck, Table,
};
use crate::timestamp::parse_timestamp;

/// Why a raw row did not make it into the cleaned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    /// Timestamp present but not parseable.
    UnparseableTimestamp(String),
    /// A required field was absent or blank.
    MissingField(&'static str),
    UnknownEventType(String),
    /// Quality result other than OK/NOK (any case).
    InvalidResult(String),
    /// Same identity as an earlier row that was kept.
    Duplicate,
}

/// A raw row index paired with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub row: usize,
    pub reason: RejectReason,
}

/// Output of [`clean_events`].
#[derive(Debug, Clone)]
pub struct CleanedEvents {
    pub table: Table<Event>,
    pub rejected: Vec<Rejection>,
}

impl CleanedEvents {
    pub fn events(&self) -> &[Event] {
        &self.table.rows
    }

    /// Rows dropped for failing validation (not counting duplicates).
    pub fn invalid_dropped(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.reason != RejectReason::Duplicate)
            .count()
    }

    pub fn duplicates_removed(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.reason == RejectReason::Duplicate)
            .count()
    }
}

/// Output of [`clean_quality`].
#[derive(Debug, Clone)]
pub struct CleanedQuality {
    pub table: Table<QualityCheck>,
    pub rejected: Vec<Rejection>,
}

impl CleanedQuality {
    pub fn checks(&self) -> &[QualityCheck] {
        &self.table.rows
    }

    pub fn invalid_dropped(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.reason != RejectReason::Duplicate)
            .count()
    }

    pub fn duplicates_removed(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.reason == RejectReason::Duplicate)
            .count()
    }
}

/// Trim, and map blank to `None`.
fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, RejectReason> {
    normalized(value).ok_or(RejectReason::MissingField(field))
}

fn validate_event(raw: &RawEvent) -> Result<Event, RejectReason> {
    let ts_text = required(&raw.ts, "ts")?;
    let ts = parse_timestamp(&ts_text).ok_or(RejectReason::UnparseableTimestamp(ts_text))?;
    let cell_id = required(&raw.cell_id, "cell_id")?;
    let robot_id = required(&raw.robot_id, "robot_id")?;
    let job_id = required(&raw.job_id, "job_id")?;
    let program_id = required(&raw.program_id, "program_id")?;
    let type_text = required(&raw.event_type, "event_type")?;
    let event_type =
        EventType::parse(&type_text).ok_or(RejectReason::UnknownEventType(type_text))?;

    Ok(Event {
        ts,
        cell_id,
        robot_id,
        job_id,
        program_id,
        event_type,
        error_code: normalized(&raw.error_code),
    })
}

/// Validate, deduplicate and sort raw events.
///
/// Surviving events are ordered by (cell_id, robot_id, job_id, ts); ties
/// keep input order.
pub fn clean_events(raw: &Table<RawEvent>) -> CleanedEvents {
    let mut rejected = Vec::new();
    let mut valid = Vec::with_capacity(raw.len());

    for (row, record) in raw.rows.iter().enumerate() {
        match validate_event(record) {
            Ok(event) => valid.push((row, event)),
            Err(reason) => rejected.push(Rejection { row, reason }),
        }
    }

    let invalid = rejected.len();
    if invalid > 0 {
        info!(rows = invalid, "dropped event rows missing critical fields");
    }

    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        valid.iter().map(|(_, e)| seen.insert(e.identity())).collect()
    };

    let mut events = Vec::with_capacity(valid.len());
    for ((row, event), keep) in valid.into_iter().zip(keep) {
        if keep {
            events.push(event);
        } else {
            rejected.push(Rejection {
                row,
                reason: RejectReason::Duplicate,
            });
        }
    }

    let duplicates = rejected.len() - invalid;
    if duplicates > 0 {
        info!(rows = duplicates, "removed duplicate event rows");
    }

    events.sort_by(|a, b| {
        (&a.cell_id, &a.robot_id, &a.job_id, a.ts).cmp(&(&b.cell_id, &b.robot_id, &b.job_id, b.ts))
    });

    CleanedEvents {
        table: Table::new(raw.columns.clone(), events),
        rejected,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn validate_quality(raw: &RawQualityCheck) -> Result<QualityCheck, RejectReason> {
    let job_id = required(&raw.job_id, "job_id")?;
    let cell_id = required(&raw.cell_id, "cell_id")?;
    let robot_id = required(&raw.robot_id, "robot_id")?;
    let program_id = required(&raw.program_id, "program_id")?;
    let result_text = required(&raw.result, "result")?;
    let result =
        QualityResult::parse(&result_text).ok_or(RejectReason::InvalidResult(result_text))?;

    Ok(QualityCheck {
        job_id,
        cell_id,
        robot_id,
        program_id,
        result,
        reason: normalized(&raw.reason),
        rework_needed: normalized(&raw.rework_needed).and_then(|v| parse_flag(&v)),
    })
}

/// Validate quality checks and collapse duplicates by `job_id`.
///
/// The first occurrence of a job wins. Input order is otherwise preserved.
pub fn clean_quality(raw: &Table<RawQualityCheck>) -> CleanedQuality {
    let mut rejected = Vec::new();
    let mut checks = Vec::with_capacity(raw.len());
    let mut seen_jobs: HashSet<String> = HashSet::new();

    for (row, record) in raw.rows.iter().enumerate() {
        match validate_quality(record) {
            Ok(check) => {
                if seen_jobs.insert(check.job_id.clone()) {
                    checks.push(check);
                } else {
                    rejected.push(Rejection {
                        row,
                        reason: RejectReason::Duplicate,
                    });
                }
            }
            Err(reason) => rejected.push(Rejection { row, reason }),
        }
    }

    if !rejected.is_empty() {
        info!(rows = rejected.len(), "dropped invalid or duplicate quality rows");
    }

    CleanedQuality {
        table: Table::new(raw.columns.clone(), checks),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(ts: &str, job: &str, kind: &str) -> RawEvent {
        RawEvent {
            ts: Some(ts.to_string()),
            cell_id: Some("C01".to_string()),
            robot_id: Some("R01".to_string()),
            job_id: Some(job.to_string()),
            program_id: Some("P001".to_string()),
            event_type: Some(kind.to_string()),
            error_code: None,
        }
    }

    fn raw_check(job: &str, result: &str) -> RawQualityCheck {
        RawQualityCheck {
            job_id: Some(job.to_string()),
            cell_id: Some("C01".to_string()),
            robot_id: Some("R01".to_string()),
            program_id: Some("P001".to_string()),
            result: Some(result.to_string()),
            reason: None,
            rework_needed: Some("False".to_string()),
        }
    }

    #[test]
    fn identical_rows_collapse_to_one() {
        let row = raw_event("2024-03-01T08:00:00Z", "J1", "START_CYCLE");
        let cleaned = clean_events(&Table::events(vec![row.clone(), row]));
        assert_eq!(cleaned.events().len(), 1);
        assert_eq!(cleaned.duplicates_removed(), 1);
        assert_eq!(cleaned.invalid_dropped(), 0);
        assert_eq!(
            cleaned.rejected,
            vec![Rejection {
                row: 1,
                reason: RejectReason::Duplicate
            }]
        );
    }

    #[test]
    fn whitespace_differences_still_dedupe() {
        let a = raw_event("2024-03-01T08:00:00Z", "J1", "START_CYCLE");
        let mut b = a.clone();
        b.cell_id = Some("  C01 ".to_string());
        let cleaned = clean_events(&Table::events(vec![a, b]));
        assert_eq!(cleaned.events().len(), 1);
    }

    #[test]
    fn invalid_rows_are_rejected_with_reason() {
        let mut missing_robot = raw_event("2024-03-01T08:00:00Z", "J1", "ARC_ON");
        missing_robot.robot_id = Some("   ".to_string());
        let rows = vec![
            raw_event("yesterday-ish", "J1", "START_CYCLE"),
            raw_event("", "J1", "START_CYCLE"),
            raw_event("2024-03-01T08:00:00Z", "J1", "WELD"),
            missing_robot,
            raw_event("2024-03-01T08:00:00Z", "J1", "START_CYCLE"),
        ];
        let cleaned = clean_events(&Table::events(rows));

        assert_eq!(cleaned.events().len(), 1);
        assert_eq!(cleaned.invalid_dropped(), 4);
        let reasons: Vec<_> = cleaned.rejected.iter().map(|r| r.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::UnparseableTimestamp("yesterday-ish".to_string()),
                RejectReason::MissingField("ts"),
                RejectReason::UnknownEventType("WELD".to_string()),
                RejectReason::MissingField("robot_id"),
            ]
        );
    }

    #[test]
    fn events_sorted_by_stream_job_and_time() {
        let mut other_cell = raw_event("2024-03-01T07:00:00Z", "J9", "START_CYCLE");
        other_cell.cell_id = Some("C02".to_string());
        let rows = vec![
            other_cell,
            raw_event("2024-03-01T08:05:00Z", "J2", "END_CYCLE"),
            raw_event("2024-03-01T08:02:00Z", "J1", "END_CYCLE"),
            raw_event("2024-03-01T08:00:00Z", "J1", "START_CYCLE"),
        ];
        let cleaned = clean_events(&Table::events(rows));
        let order: Vec<(&str, &str, EventType)> = cleaned
            .events()
            .iter()
            .map(|e| (e.cell_id.as_str(), e.job_id.as_str(), e.event_type))
            .collect();
        assert_eq!(
            order,
            vec![
                ("C01", "J1", EventType::StartCycle),
                ("C01", "J1", EventType::EndCycle),
                ("C01", "J2", EventType::EndCycle),
                ("C02", "J9", EventType::StartCycle),
            ]
        );
    }

    #[test]
    fn error_code_blank_becomes_none() {
        let mut row = raw_event("2024-03-01T08:00:00Z", "J1", "ERROR");
        row.error_code = Some(" ".to_string());
        let cleaned = clean_events(&Table::events(vec![row]));
        assert_eq!(cleaned.events()[0].error_code, None);
    }

    #[test]
    fn quality_result_normalized_and_invalid_dropped() {
        let rows = vec![
            raw_check("J1", "ok"),
            raw_check("J2", " nok "),
            raw_check("J3", "unknown"),
            raw_check("J4", ""),
        ];
        let cleaned = clean_quality(&Table::quality(rows));
        let results: Vec<_> = cleaned.checks().iter().map(|c| c.result).collect();
        assert_eq!(results, vec![QualityResult::Ok, QualityResult::Nok]);
        assert_eq!(cleaned.invalid_dropped(), 2);
        assert_eq!(
            cleaned.rejected[0].reason,
            RejectReason::InvalidResult("unknown".to_string())
        );
        assert_eq!(cleaned.rejected[1].reason, RejectReason::MissingField("result"));
    }

    #[test]
    fn quality_dedup_keeps_first_job_occurrence() {
        let rows = vec![raw_check("J1", "OK"), raw_check("J1", "NOK")];
        let cleaned = clean_quality(&Table::quality(rows));
        assert_eq!(cleaned.checks().len(), 1);
        assert_eq!(cleaned.checks()[0].result, QualityResult::Ok);
        assert_eq!(cleaned.duplicates_removed(), 1);
    }

    #[test]
    fn rework_flag_parsing() {
        let mut a = raw_check("J1", "NOK");
        a.rework_needed = Some("True".to_string());
        let mut b = raw_check("J2", "NOK");
        b.rework_needed = Some("perhaps".to_string());
        let cleaned = clean_quality(&Table::quality(vec![a, b]));
        assert_eq!(cleaned.checks()[0].rework_needed, Some(true));
        assert_eq!(cleaned.checks()[1].rework_needed, None);
    }

    #[test]
    fn empty_input_is_valid() {
        let cleaned = clean_events(&Table::events(vec![]));
        assert!(cleaned.events().is_empty());
        assert!(cleaned.rejected.is_empty());
    }
}
