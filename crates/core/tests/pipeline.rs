//! End-to-end tests over the whole core pipeline:
//! raw rows -> cleaner -> DQ audit -> KPI report -> drilldown.

use weldline_core::{
    build_dq_report, build_drilldown, clean_events, clean_quality, DrilldownReport, KpiReport,
    RawEvent, RawQualityCheck, Severity, Table,
};

fn ev(ts: &str, cell: &str, robot: &str, job: &str, kind: &str, code: Option<&str>) -> RawEvent {
    RawEvent {
        ts: Some(ts.to_string()),
        cell_id: Some(cell.to_string()),
        robot_id: Some(robot.to_string()),
        job_id: Some(job.to_string()),
        program_id: Some("P007".to_string()),
        event_type: Some(kind.to_string()),
        error_code: code.map(str::to_string),
    }
}

fn qc(job: &str, cell: &str, robot: &str, result: &str) -> RawQualityCheck {
    RawQualityCheck {
        job_id: Some(job.to_string()),
        cell_id: Some(cell.to_string()),
        robot_id: Some(robot.to_string()),
        program_id: Some("P007".to_string()),
        result: Some(result.to_string()),
        reason: (result == "NOK").then(|| "porosity".to_string()),
        rework_needed: Some("False".to_string()),
    }
}

/// Two cells, three robots, one duplicated row, one bad timestamp,
/// one unknown event type, one orphan ARC_ON.
fn fixture() -> (Table<RawEvent>, Table<RawQualityCheck>) {
    let start = ev("2024-03-01 08:00:00+00:00", "C01", "R01", "J1", "START_CYCLE", None);
    let events = vec![
        start.clone(),
        start,
        ev("2024-03-01 08:00:05+00:00", "C01", "R01", "J1", "ARC_ON", None),
        ev("2024-03-01 08:00:50+00:00", "C01", "R01", "J1", "ARC_OFF", None),
        ev("2024-03-01 08:01:30+00:00", "C01", "R01", "J1", "END_CYCLE", None),
        ev("2024-03-01 09:00:00+00:00", "C01", "R02", "J2", "START_CYCLE", None),
        ev("2024-03-01 09:00:04+00:00", "C01", "R02", "J2", "ARC_ON", None),
        ev("2024-03-01 09:00:20+00:00", "C01", "R02", "J2", "ERROR", Some("CDD2")),
        ev("2024-03-01 09:06:00+00:00", "C01", "R02", "J2", "RESET", None),
        ev("2024-03-01 09:08:00+00:00", "C01", "R02", "J2", "END_CYCLE", None),
        ev("not a time", "C02", "R01", "J3", "START_CYCLE", None),
        ev("2024-03-01 10:00:00+00:00", "C02", "R01", "J3", "START_CYCLE", None),
        ev("2024-03-01 10:01:10+00:00", "C02", "R01", "J3", "TELEPORT", None),
        ev("2024-03-01 10:02:00+00:00", "C02", "R01", "J3", "END_CYCLE", None),
    ];
    let quality = vec![
        qc("J1", "C01", "R01", "OK"),
        qc("J2", "C01", "R02", "nok"),
        qc("J3", "C02", "R01", "OK"),
        qc("J3", "C02", "R01", "NOK"),
    ];
    (Table::events(events), Table::quality(quality))
}

#[test]
fn dq_report_reflects_cleaning() {
    let (events_raw, quality_raw) = fixture();
    let events = clean_events(&events_raw);
    let quality = clean_quality(&quality_raw);
    let dq = build_dq_report(&events_raw, events.events(), &quality_raw, quality.checks());

    assert_eq!(dq.events_rows_in, 14);
    assert_eq!(dq.events_rows_out, 11);
    assert_eq!(dq.quality_rows_in, 4);
    assert_eq!(dq.quality_rows_out, 3);
    assert_eq!(dq.missing_ts_in_raw, 1);
    assert_eq!(dq.duplicates_removed, 1);
    assert_eq!(dq.arc_on_without_off, 1);
    assert_eq!(dq.arc_off_without_on, 0);
    assert_eq!(dq.missing_start_end_pairs, 0);

    assert_eq!(events.duplicates_removed(), 1);
    assert_eq!(events.invalid_dropped(), 2);
}

#[test]
fn kpi_report_over_cleaned_run() {
    let (events_raw, quality_raw) = fixture();
    let events = clean_events(&events_raw);
    let quality = clean_quality(&quality_raw);

    let report = KpiReport::compute(events.events(), quality.checks()).with_alerts(None);

    assert_eq!(report.snapshot.jobs_total, 3);
    assert_eq!(report.snapshot.jobs_nok, 1);
    assert_eq!(report.snapshot.scrap_rate, 0.3333);
    assert_eq!(report.snapshot.cycle_time_sec.count, 3);
    // cycles: 90, 480, 120
    assert_eq!(report.snapshot.cycle_time_sec.p50, Some(120.0));
    assert_eq!(report.snapshot.arc_on_time_sec.count, 1);
    assert_eq!(report.snapshot.top_error_codes.get("CDD2"), Some(1));
    assert_eq!(report.max_downtime_event_sec, 340.0);
    assert_eq!(report.cycle_time_p95_sec, 444.0);

    let levels: Vec<Severity> = report.alerts.iter().map(|a| a.level).collect();
    assert_eq!(levels, vec![Severity::Alert, Severity::Warning, Severity::Alert]);
}

#[test]
fn drilldown_over_cleaned_run() {
    let (events_raw, quality_raw) = fixture();
    let events = clean_events(&events_raw);
    let quality = clean_quality(&quality_raw);

    let report = build_drilldown(&events.table, &quality.table, 1, "2024-03-02T00:00:00Z");
    let DrilldownReport::Complete(summary) = report else {
        panic!("expected a complete drilldown");
    };

    assert_eq!(summary.counts.cells, 2);
    assert_eq!(summary.counts.robots, 3);
    assert_eq!(summary.worst_offenders.cells_by_scrap_rate.len(), 1);
    assert_eq!(summary.worst_offenders.cells_by_scrap_rate[0].cell_id, "C01");
    assert_eq!(summary.worst_offenders.robots_by_max_downtime[0].robot_id, "R02");
    assert_eq!(
        summary.worst_offenders.robots_by_max_downtime[0]
            .kpis
            .max_downtime_event_sec,
        340.0
    );
}

#[test]
fn kpi_output_is_byte_identical_across_runs() {
    let (events_raw, quality_raw) = fixture();
    let events = clean_events(&events_raw);
    let quality = clean_quality(&quality_raw);

    let render = || {
        serde_json::to_string_pretty(
            &KpiReport::compute(events.events(), quality.checks()).with_alerts(None),
        )
        .unwrap()
    };
    assert_eq!(render(), render());
}
