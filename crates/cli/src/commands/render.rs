//! Human-readable report summaries for text output.

use serde_json::Value;
use weldline_core::{DistributionSummary, DqReport, DrilldownReport, KpiReport};

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn distribution(d: &DistributionSummary) -> String {
    format!(
        "count={} mean={} p50={} p95={}",
        d.count,
        opt(d.mean),
        opt(d.p50),
        opt(d.p95)
    )
}

pub(super) fn dq(report: &DqReport) {
    println!(
        "  events rows:        {} in, {} out",
        report.events_rows_in, report.events_rows_out
    );
    println!(
        "  quality rows:       {} in, {} out",
        report.quality_rows_in, report.quality_rows_out
    );
    println!("  missing ts (raw):   {}", report.missing_ts_in_raw);
    println!("  duplicates removed: {}", report.duplicates_removed);
    println!("  ARC_ON without OFF: {}", report.arc_on_without_off);
    println!("  ARC_OFF without ON: {}", report.arc_off_without_on);
    println!("  START/END unpaired: {}", report.missing_start_end_pairs);
}

pub(super) fn kpi(report: &KpiReport) {
    let s = &report.snapshot;
    println!("  jobs:            {} total, {} NOK", s.jobs_total, s.jobs_nok);
    println!("  scrap rate:      {}", s.scrap_rate);
    println!("  cycle time (s):  {}", distribution(&s.cycle_time_sec));
    println!("  arc-on time (s): {}", distribution(&s.arc_on_time_sec));
    println!("  max downtime(s): {}", report.max_downtime_event_sec);
    if !s.top_error_codes.is_empty() {
        let codes: Vec<String> = s
            .top_error_codes
            .0
            .iter()
            .map(|(code, n)| format!("{}={}", code, n))
            .collect();
        println!("  top errors:      {}", codes.join(", "));
    }
    for alert in &report.alerts {
        println!(
            "  [{:<7}] {} = {} (warning > {}, alert > {})",
            alert.level,
            alert.metric.name(),
            alert.value,
            alert.thresholds.warning_gt,
            alert.thresholds.alert_gt
        );
    }
}

pub(super) fn drilldown(report: &DrilldownReport) {
    match report {
        DrilldownReport::Complete(summary) => {
            println!(
                "  {} cells, {} robots (generated {})",
                summary.counts.cells, summary.counts.robots, summary.generated_at
            );
            if let Some(worst) = summary.worst_offenders.cells_by_scrap_rate.first() {
                println!(
                    "  worst cell by scrap rate: {} ({})",
                    worst.cell_id, worst.kpis.scrap_rate
                );
            }
            if let Some(worst) = summary.worst_offenders.robots_by_max_downtime.first() {
                println!(
                    "  worst robot by downtime:  {}/{} ({} s)",
                    worst.cell_id, worst.robot_id, worst.kpis.max_downtime_event_sec
                );
            }
        }
        DrilldownReport::Degraded {
            generated_at,
            error,
        } => {
            println!("  drilldown unavailable (generated {}): {}", generated_at, error);
        }
    }
}

/// Field-by-field view of a report that lacks some of its fields.
pub(super) fn partial(report: &Value) {
    println!("  (partial report)");
    match report.as_object() {
        Some(fields) => {
            for (key, value) in fields {
                match value {
                    Value::String(text) => println!("  {}: {}", key, text),
                    other => println!("  {}: {}", key, other),
                }
            }
        }
        None => println!("  {}", report),
    }
}
