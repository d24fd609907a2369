//! Drilldown aggregator.
//!
//! Repeats the KPI computation per cell and per (cell, robot) and ranks the
//! entities by each alerting metric.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::downtime::ResetPairing;
use crate::kpi::KpiReport;
use crate::records::{Event, QualityCheck, Table};

/// Default length of each worst-offenders list.
pub const DEFAULT_TOP_N: usize = 5;

/// Reduced KPI projection for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSummary {
    pub cell_id: String,
    #[serde(flatten)]
    pub kpis: EntityKpis,
}

/// Reduced KPI projection for one robot within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSummary {
    pub cell_id: String,
    pub robot_id: String,
    #[serde(flatten)]
    pub kpis: EntityKpis,
}

/// The metrics every drilldown entity carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityKpis {
    pub jobs_total: usize,
    pub jobs_nok: usize,
    pub scrap_rate: f64,
    pub max_downtime_event_sec: f64,
    /// Same projection as the KPI report: 0.0 without complete cycles.
    pub cycle_time_p95_sec: f64,
}

impl EntityKpis {
    fn from_slice(
        events: &[Event],
        quality: &[QualityCheck],
        pairing: ResetPairing,
    ) -> EntityKpis {
        let report = KpiReport::compute_with(events, quality, pairing);
        EntityKpis {
            jobs_total: report.snapshot.jobs_total,
            jobs_nok: report.snapshot.jobs_nok,
            scrap_rate: report.snapshot.scrap_rate,
            max_downtime_event_sec: report.max_downtime_event_sec,
            cycle_time_p95_sec: report.cycle_time_p95_sec,
        }
    }

    /// The ranked value, or `None` when it is NaN and cannot be ordered.
    pub fn metric(&self, metric: RankMetric) -> Option<f64> {
        let value = match metric {
            RankMetric::ScrapRate => self.scrap_rate,
            RankMetric::MaxDowntime => self.max_downtime_event_sec,
            RankMetric::CycleP95 => self.cycle_time_p95_sec,
        };
        (!value.is_nan()).then_some(value)
    }
}

/// Metrics the worst-offenders lists are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    ScrapRate,
    MaxDowntime,
    CycleP95,
}

/// Anything that carries [`EntityKpis`] and can be ranked.
pub trait Ranked {
    fn kpis(&self) -> &EntityKpis;
}

impl Ranked for CellSummary {
    fn kpis(&self) -> &EntityKpis {
        &self.kpis
    }
}

impl Ranked for RobotSummary {
    fn kpis(&self) -> &EntityKpis {
        &self.kpis
    }
}

/// Top `n` entries by `metric`, descending. Entries whose value cannot be
/// ordered are left out; equal values keep input order.
pub fn top_n<T: Ranked + Clone>(rows: &[T], metric: RankMetric, n: usize) -> Vec<T> {
    let mut ranked: Vec<(f64, &T)> = rows
        .iter()
        .filter_map(|r| r.kpis().metric(metric).map(|v| (v, r)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(n).map(|(_, r)| r.clone()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrilldownCounts {
    pub cells: usize,
    pub robots: usize,
}

/// The six ranked lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstOffenders {
    pub cells_by_scrap_rate: Vec<CellSummary>,
    pub cells_by_max_downtime: Vec<CellSummary>,
    pub cells_by_cycle_p95: Vec<CellSummary>,
    pub robots_by_scrap_rate: Vec<RobotSummary>,
    pub robots_by_max_downtime: Vec<RobotSummary>,
    pub robots_by_cycle_p95: Vec<RobotSummary>,
}

impl WorstOffenders {
    fn rank(cells: &[CellSummary], robots: &[RobotSummary], n: usize) -> WorstOffenders {
        WorstOffenders {
            cells_by_scrap_rate: top_n(cells, RankMetric::ScrapRate, n),
            cells_by_max_downtime: top_n(cells, RankMetric::MaxDowntime, n),
            cells_by_cycle_p95: top_n(cells, RankMetric::CycleP95, n),
            robots_by_scrap_rate: top_n(robots, RankMetric::ScrapRate, n),
            robots_by_max_downtime: top_n(robots, RankMetric::MaxDowntime, n),
            robots_by_cycle_p95: top_n(robots, RankMetric::CycleP95, n),
        }
    }
}

/// Complete drilldown over all cells and robots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrilldownSummary {
    pub generated_at: String,
    pub counts: DrilldownCounts,
    pub per_cell: Vec<CellSummary>,
    pub per_robot: Vec<RobotSummary>,
    pub worst_offenders: WorstOffenders,
}

/// Drilldown output: a full summary, or an explicit error when the inputs
/// cannot be broken down by cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DrilldownReport {
    Complete(DrilldownSummary),
    Degraded { generated_at: String, error: String },
}

impl DrilldownReport {
    pub fn generated_at(&self) -> &str {
        match self {
            DrilldownReport::Complete(summary) => &summary.generated_at,
            DrilldownReport::Degraded { generated_at, .. } => generated_at,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DrilldownReport::Complete(_) => None,
            DrilldownReport::Degraded { error, .. } => Some(error),
        }
    }

    pub fn counts(&self) -> Option<&DrilldownCounts> {
        match self {
            DrilldownReport::Complete(summary) => Some(&summary.counts),
            DrilldownReport::Degraded { .. } => None,
        }
    }
}

/// Build the drilldown report.
///
/// `generated_at` is supplied by the caller so the computation itself stays
/// a pure function of its inputs.
pub fn build_drilldown(
    events: &Table<Event>,
    quality: &Table<QualityCheck>,
    top: usize,
    generated_at: &str,
) -> DrilldownReport {
    build_drilldown_with(events, quality, top, generated_at, ResetPairing::default())
}

/// [`build_drilldown`] with an explicit ERROR/RESET pairing for the
/// per-entity downtime.
pub fn build_drilldown_with(
    events: &Table<Event>,
    quality: &Table<QualityCheck>,
    top: usize,
    generated_at: &str,
    pairing: ResetPairing,
) -> DrilldownReport {
    if !events.has_column("cell_id") || !quality.has_column("cell_id") {
        return DrilldownReport::Degraded {
            generated_at: generated_at.to_string(),
            error: "Missing 'cell_id' in events/quality. Drilldown needs cell_id columns."
                .to_string(),
        };
    }

    let cell_ids: BTreeSet<&str> = events
        .rows
        .iter()
        .map(|e| e.cell_id.as_str())
        .chain(quality.rows.iter().map(|q| q.cell_id.as_str()))
        .collect();

    let mut per_cell = Vec::with_capacity(cell_ids.len());
    for cell_id in cell_ids {
        let ev: Vec<Event> = events
            .rows
            .iter()
            .filter(|e| e.cell_id == cell_id)
            .cloned()
            .collect();
        let qu: Vec<QualityCheck> = quality
            .rows
            .iter()
            .filter(|q| q.cell_id == cell_id)
            .cloned()
            .collect();
        if ev.is_empty() && qu.is_empty() {
            continue;
        }
        per_cell.push(CellSummary {
            cell_id: cell_id.to_string(),
            kpis: EntityKpis::from_slice(&ev, &qu, pairing),
        });
    }

    let mut per_robot = Vec::new();
    if events.has_column("robot_id") && quality.has_column("robot_id") {
        let pairs: BTreeSet<(&str, &str)> = events
            .rows
            .iter()
            .map(|e| (e.cell_id.as_str(), e.robot_id.as_str()))
            .chain(
                quality
                    .rows
                    .iter()
                    .map(|q| (q.cell_id.as_str(), q.robot_id.as_str())),
            )
            .collect();

        for (cell_id, robot_id) in pairs {
            let ev: Vec<Event> = events
                .rows
                .iter()
                .filter(|e| e.cell_id == cell_id && e.robot_id == robot_id)
                .cloned()
                .collect();
            let qu: Vec<QualityCheck> = quality
                .rows
                .iter()
                .filter(|q| q.cell_id == cell_id && q.robot_id == robot_id)
                .cloned()
                .collect();
            if ev.is_empty() && qu.is_empty() {
                continue;
            }
            per_robot.push(RobotSummary {
                cell_id: cell_id.to_string(),
                robot_id: robot_id.to_string(),
                kpis: EntityKpis::from_slice(&ev, &qu, pairing),
            });
        }
    }

    let worst_offenders = WorstOffenders::rank(&per_cell, &per_robot, top);

    DrilldownReport::Complete(DrilldownSummary {
        generated_at: generated_at.to_string(),
        counts: DrilldownCounts {
            cells: per_cell.len(),
            robots: per_robot.len(),
        },
        per_cell,
        per_robot,
        worst_offenders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EventType, QualityResult, EVENT_COLUMNS, QUALITY_COLUMNS};
    use time::macros::datetime;
    use time::Duration;

    const NOW: &str = "2024-03-08T12:00:00Z";

    fn cell(id: &str, scrap_rate: f64) -> CellSummary {
        CellSummary {
            cell_id: id.to_string(),
            kpis: EntityKpis {
                jobs_total: 10,
                jobs_nok: 0,
                scrap_rate,
                max_downtime_event_sec: 0.0,
                cycle_time_p95_sec: 0.0,
            },
        }
    }

    fn event(cell: &str, robot: &str, job: &str, kind: EventType, t: i64) -> Event {
        Event {
            ts: datetime!(2024-03-01 08:00:00 UTC) + Duration::seconds(t),
            cell_id: cell.to_string(),
            robot_id: robot.to_string(),
            job_id: job.to_string(),
            program_id: "P001".to_string(),
            event_type: kind,
            error_code: None,
        }
    }

    fn check(cell: &str, robot: &str, job: &str, result: QualityResult) -> QualityCheck {
        QualityCheck {
            job_id: job.to_string(),
            cell_id: cell.to_string(),
            robot_id: robot.to_string(),
            program_id: "P001".to_string(),
            result,
            reason: None,
            rework_needed: None,
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn tables(
        events: Vec<Event>,
        quality: Vec<QualityCheck>,
    ) -> (Table<Event>, Table<QualityCheck>) {
        (
            Table::new(columns(&EVENT_COLUMNS), events),
            Table::new(columns(&QUALITY_COLUMNS), quality),
        )
    }

    #[test]
    fn ranking_keeps_top_n_descending() {
        let cells = vec![
            cell("C01", 0.5),
            cell("C02", 0.3),
            cell("C03", 0.9),
            cell("C04", 0.1),
        ];
        let top = top_n(&cells, RankMetric::ScrapRate, 2);
        let rates: Vec<f64> = top.iter().map(|c| c.kpis.scrap_rate).collect();
        assert_eq!(rates, vec![0.9, 0.5]);
    }

    #[test]
    fn ranking_skips_unorderable_values() {
        let mut with_p95 = cell("C02", 0.0);
        with_p95.kpis.cycle_time_p95_sec = 110.0;
        let mut unknown = cell("C03", 0.0);
        unknown.kpis.cycle_time_p95_sec = f64::NAN;
        let cells = vec![cell("C01", 0.0), with_p95, unknown];
        let top = top_n(&cells, RankMetric::CycleP95, 5);
        let ids: Vec<&str> = top.iter().map(|c| c.cell_id.as_str()).collect();
        assert_eq!(ids, vec!["C02", "C01"]);
    }

    #[test]
    fn per_cell_and_per_robot_breakdown() {
        let (events, quality) = tables(
            vec![
                event("C01", "R01", "J1", EventType::StartCycle, 0),
                event("C01", "R01", "J1", EventType::EndCycle, 80),
                event("C01", "R02", "J2", EventType::StartCycle, 0),
                event("C01", "R02", "J2", EventType::EndCycle, 140),
                event("C02", "R01", "J3", EventType::Error, 0),
                event("C02", "R01", "J3", EventType::Reset, 600),
            ],
            vec![
                check("C01", "R01", "J1", QualityResult::Ok),
                check("C01", "R02", "J2", QualityResult::Nok),
                check("C02", "R01", "J3", QualityResult::Ok),
                check("C03", "R01", "J4", QualityResult::Nok),
            ],
        );

        let report = build_drilldown(&events, &quality, DEFAULT_TOP_N, NOW);
        let DrilldownReport::Complete(summary) = report else {
            panic!("expected a complete drilldown");
        };

        assert_eq!(summary.counts, DrilldownCounts { cells: 3, robots: 4 });
        let ids: Vec<&str> = summary.per_cell.iter().map(|c| c.cell_id.as_str()).collect();
        assert_eq!(ids, vec!["C01", "C02", "C03"]);

        let c01 = &summary.per_cell[0].kpis;
        assert_eq!(c01.jobs_total, 2);
        assert_eq!(c01.jobs_nok, 1);
        assert_eq!(c01.scrap_rate, 0.5);

        let c02 = &summary.per_cell[1].kpis;
        assert_eq!(c02.max_downtime_event_sec, 600.0);
        assert_eq!(c02.cycle_time_p95_sec, 0.0);

        let worst = &summary.worst_offenders;
        assert_eq!(worst.cells_by_scrap_rate[0].cell_id, "C03");
        assert_eq!(worst.cells_by_max_downtime[0].cell_id, "C02");
        // entities without cycles rank at 0.0 instead of dropping out
        assert_eq!(worst.cells_by_cycle_p95.len(), 3);
        assert_eq!(worst.cells_by_cycle_p95[0].cell_id, "C01");
        let json = serde_json::to_value(&summary.per_cell[1]).unwrap();
        assert_eq!(json["cycle_time_p95_sec"], 0.0);
        assert_eq!(
            (
                worst.robots_by_cycle_p95[0].cell_id.as_str(),
                worst.robots_by_cycle_p95[0].robot_id.as_str()
            ),
            ("C01", "R02")
        );
        assert_eq!(worst.robots_by_cycle_p95[0].kpis.cycle_time_p95_sec, 140.0);
    }

    #[test]
    fn pairing_applies_per_robot() {
        let (events, quality) = tables(
            vec![
                event("C01", "R01", "J1", EventType::Error, 0),
                event("C01", "R01", "J1", EventType::Error, 500),
                event("C01", "R01", "J1", EventType::Reset, 3700),
            ],
            Vec::new(),
        );
        let downtime = |pairing| {
            let report = build_drilldown_with(&events, &quality, DEFAULT_TOP_N, NOW, pairing);
            let DrilldownReport::Complete(summary) = report else {
                panic!("expected a complete drilldown");
            };
            summary.per_robot[0].kpis.max_downtime_event_sec
        };
        assert_eq!(downtime(ResetPairing::Nearest), 3200.0);
        assert_eq!(downtime(ResetPairing::FirstErrorOnly), 0.0);
    }

    #[test]
    fn missing_cell_column_degrades() {
        let events = Table::new(columns(&["ts", "robot_id"]), Vec::new());
        let quality = Table::new(columns(&QUALITY_COLUMNS), Vec::new());
        let report = build_drilldown(&events, &quality, DEFAULT_TOP_N, NOW);

        assert!(report.error().unwrap().contains("cell_id"));
        assert_eq!(report.generated_at(), NOW);
        assert!(report.counts().is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn missing_robot_column_skips_robot_level() {
        let events = Table::new(
            columns(&["ts", "cell_id", "job_id", "program_id", "event_type"]),
            vec![event("C01", "R01", "J1", EventType::StartCycle, 0)],
        );
        let quality = Table::new(columns(&QUALITY_COLUMNS), Vec::new());
        let report = build_drilldown(&events, &quality, DEFAULT_TOP_N, NOW);
        assert_eq!(report.counts(), Some(&DrilldownCounts { cells: 1, robots: 0 }));
    }

    #[test]
    fn json_shape_and_round_trip() {
        let (events, quality) = tables(
            vec![],
            vec![check("C01", "R01", "J1", QualityResult::Nok)],
        );
        let report = build_drilldown(&events, &quality, 3, NOW);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["counts"]["cells"], 1);
        assert_eq!(json["per_cell"][0]["cell_id"], "C01");
        assert_eq!(json["per_cell"][0]["scrap_rate"], 1.0);
        assert!(json["worst_offenders"]["robots_by_scrap_rate"].is_array());

        let back: DrilldownReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
