//! Data-quality auditor.
//!
//! Compares raw and cleaned tables and checks event pairing inside each job.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::records::{Event, EventType, QualityCheck, RawEvent, RawQualityCheck, Table};
use crate::timestamp::parse_timestamp;

/// Fixed-shape data-quality diagnostic for one transform run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqReport {
    pub events_rows_in: usize,
    pub events_rows_out: usize,
    pub quality_rows_in: usize,
    pub quality_rows_out: usize,

    pub missing_ts_in_raw: usize,
    pub duplicates_removed: usize,

    pub arc_on_without_off: usize,
    pub arc_off_without_on: usize,
    pub missing_start_end_pairs: usize,
}

/// Per-job event-type tallies.
#[derive(Debug, Default)]
struct JobTally {
    start: usize,
    end: usize,
    arc_on: usize,
    arc_off: usize,
}

/// Build the DQ report.
///
/// `duplicates_removed` is counted on the raw rows using the cleaner's
/// identity key. It is an approximation: raw rows that differ only in
/// whitespace are not counted, and duplicates of rows the cleaner rejected
/// for other reasons are.
pub fn build_dq_report(
    events_raw: &Table<RawEvent>,
    events_clean: &[Event],
    quality_raw: &Table<RawQualityCheck>,
    quality_clean: &[QualityCheck],
) -> DqReport {
    let missing_ts_in_raw = events_raw
        .rows
        .iter()
        .filter(|r| r.ts.as_deref().and_then(parse_timestamp).is_none())
        .count();

    let duplicates_removed = {
        let mut seen = HashSet::new();
        events_raw.rows.iter().filter(|r| !seen.insert(*r)).count()
    };

    let mut tallies: BTreeMap<(&str, &str, &str), JobTally> = BTreeMap::new();
    for event in events_clean {
        let tally = tallies
            .entry((
                event.cell_id.as_str(),
                event.robot_id.as_str(),
                event.job_id.as_str(),
            ))
            .or_default();
        match event.event_type {
            EventType::StartCycle => tally.start += 1,
            EventType::EndCycle => tally.end += 1,
            EventType::ArcOn => tally.arc_on += 1,
            EventType::ArcOff => tally.arc_off += 1,
            EventType::Error | EventType::Reset => {}
        }
    }

    let mut arc_on_without_off = 0;
    let mut arc_off_without_on = 0;
    let mut missing_start_end_pairs = 0;
    for tally in tallies.values() {
        arc_on_without_off += tally.arc_on.saturating_sub(tally.arc_off);
        arc_off_without_on += tally.arc_off.saturating_sub(tally.arc_on);
        missing_start_end_pairs += tally.start.abs_diff(tally.end);
    }

    DqReport {
        events_rows_in: events_raw.len(),
        events_rows_out: events_clean.len(),
        quality_rows_in: quality_raw.len(),
        quality_rows_out: quality_clean.len(),
        missing_ts_in_raw,
        duplicates_removed,
        arc_on_without_off,
        arc_off_without_on,
        missing_start_end_pairs,
    }
}
