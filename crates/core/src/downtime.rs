//! Downtime analyzer.
//!
//! Pairs ERROR events with the RESET that clears them inside each
//! (cell_id, robot_id) stream and reports the longest plausible interval.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::records::{Event, EventType};
use crate::timestamp::seconds_between;

/// Intervals longer than this are treated as a stale, unrelated reset.
pub const MAX_DOWNTIME_SECONDS: f64 = 3600.0;

/// How ERROR events are matched to RESET events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetPairing {
    /// Every ERROR is matched independently to the first RESET after it,
    /// so one RESET can close several preceding faults.
    #[default]
    Nearest,
    /// A RESET clears all pending ERRORs but only the earliest one is
    /// credited with the interval.
    FirstErrorOnly,
}

fn accept(dt: f64) -> Option<f64> {
    (dt > 0.0 && dt <= MAX_DOWNTIME_SECONDS).then_some(dt)
}

/// Longest single ERROR→RESET interval across all streams, in seconds.
///
/// Only intervals in `(0, MAX_DOWNTIME_SECONDS]` count. Returns 0.0 when
/// nothing qualifies.
pub fn max_downtime_event_seconds(events: &[Event]) -> f64 {
    max_downtime_with(events, ResetPairing::Nearest)
}

pub fn max_downtime_with(events: &[Event], pairing: ResetPairing) -> f64 {
    let mut streams: BTreeMap<(&str, &str), Vec<(OffsetDateTime, EventType)>> = BTreeMap::new();
    for event in events {
        if matches!(event.event_type, EventType::Error | EventType::Reset) {
            streams
                .entry((event.cell_id.as_str(), event.robot_id.as_str()))
                .or_default()
                .push((event.ts, event.event_type));
        }
    }

    let mut max_dt = 0.0_f64;
    for stream in streams.values_mut() {
        // stable: equal timestamps keep input order
        stream.sort_by_key(|(ts, _)| *ts);
        let best = match pairing {
            ResetPairing::Nearest => longest_nearest(stream),
            ResetPairing::FirstErrorOnly => longest_first_error(stream),
        };
        max_dt = max_dt.max(best);
    }
    max_dt
}

fn longest_nearest(stream: &[(OffsetDateTime, EventType)]) -> f64 {
    let mut next_reset: Option<OffsetDateTime> = None;
    let mut best = 0.0_f64;
    for &(ts, kind) in stream.iter().rev() {
        match kind {
            EventType::Reset => next_reset = Some(ts),
            EventType::Error => {
                if let Some(dt) = next_reset.and_then(|reset| accept(seconds_between(ts, reset))) {
                    best = best.max(dt);
                }
            }
            _ => {}
        }
    }
    best
}

fn longest_first_error(stream: &[(OffsetDateTime, EventType)]) -> f64 {
    let mut pending: Option<OffsetDateTime> = None;
    let mut best = 0.0_f64;
    for &(ts, kind) in stream {
        match kind {
            EventType::Error => {
                pending.get_or_insert(ts);
            }
            EventType::Reset => {
                if let Some(dt) = pending.take().and_then(|err| accept(seconds_between(err, ts))) {
                    best = best.max(dt);
                }
            }
            _ => {}
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    fn ev(cell: &str, robot: &str, kind: EventType, t: i64) -> Event {
        Event {
            ts: datetime!(2024-03-01 00:00:00 UTC) + Duration::seconds(t),
            cell_id: cell.to_string(),
            robot_id: robot.to_string(),
            job_id: "J1".to_string(),
            program_id: "P001".to_string(),
            event_type: kind,
            error_code: None,
        }
    }

    #[test]
    fn single_pair() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R01", EventType::Reset, 100),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 100.0);
    }

    #[test]
    fn stale_reset_ignored() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R01", EventType::Reset, 4000),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 0.0);
    }

    #[test]
    fn exactly_one_hour_counts() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R01", EventType::Reset, 3600),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 3600.0);
    }

    #[test]
    fn zero_interval_and_no_reset() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 50),
            ev("C01", "R01", EventType::Reset, 50),
            ev("C01", "R02", EventType::Error, 0),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 0.0);
        assert_eq!(max_downtime_event_seconds(&[]), 0.0);
    }

    #[test]
    fn streams_do_not_mix() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R02", EventType::Reset, 100),
            ev("C02", "R01", EventType::Reset, 200),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 0.0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let events = vec![
            ev("C01", "R01", EventType::Reset, 300),
            ev("C01", "R01", EventType::StartCycle, 10),
            ev("C01", "R01", EventType::Error, 120),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 180.0);
    }

    #[test]
    fn several_errors_share_one_reset() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R01", EventType::Error, 500),
            ev("C01", "R01", EventType::Reset, 3700),
        ];
        // first ERROR is 3700s away (stale), the second is credited 3200s
        assert_eq!(max_downtime_with(&events, ResetPairing::Nearest), 3200.0);
        assert_eq!(max_downtime_with(&events, ResetPairing::FirstErrorOnly), 0.0);
    }

    #[test]
    fn first_error_only_pairs_per_reset() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R01", EventType::Error, 10),
            ev("C01", "R01", EventType::Reset, 60),
            ev("C01", "R01", EventType::Reset, 500),
        ];
        assert_eq!(max_downtime_with(&events, ResetPairing::FirstErrorOnly), 60.0);
        assert_eq!(max_downtime_with(&events, ResetPairing::Nearest), 60.0);
    }

    #[test]
    fn maximum_across_streams() {
        let events = vec![
            ev("C01", "R01", EventType::Error, 0),
            ev("C01", "R01", EventType::Reset, 30),
            ev("C02", "R01", EventType::Error, 0),
            ev("C02", "R01", EventType::Reset, 900),
        ];
        assert_eq!(max_downtime_event_seconds(&events), 900.0);
    }
}
