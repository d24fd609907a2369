use std::path::PathBuf;

use serde::Serialize;
use tracing::info;
use weldline_core::Alert;

use super::{emit, or_exit};
use crate::pipeline::{self, Workspace};
use crate::synth::GenConfig;
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct RunSummary {
    raw_events: PathBuf,
    raw_quality: PathBuf,
    staged_events: PathBuf,
    staged_quality: PathBuf,
    dq_latest: PathBuf,
    kpi_latest: PathBuf,
    /// `None` when the drilldown was skipped.
    drilldown_latest: Option<PathBuf>,
    alerts: Vec<Alert>,
}

/// Generate, transform, report. Each stage picks up the newest files the
/// previous one left on disk.
fn run_stages(
    ws: &Workspace,
    cfg: &GenConfig,
    top_n: usize,
    drilldown: bool,
) -> Result<RunSummary, String> {
    ws.ensure()?;

    pipeline::generate(cfg, &ws.layout.raw_dir)?;
    let (raw_events, raw_quality) = ws.latest_raw()?;
    info!(events = %raw_events.display(), quality = %raw_quality.display(), "stage 1/4: generated");

    let transformed = pipeline::transform(ws, &raw_events, &raw_quality)?;
    let (staged_events, staged_quality) = ws.latest_staged()?;
    info!(events = %staged_events.display(), "stage 2/4: transformed");

    let kpi = pipeline::report_kpi(ws, &staged_events, &staged_quality)?;
    info!(latest = %kpi.report_paths.latest.display(), "stage 3/4: KPI report written");

    let drilldown_latest = if drilldown {
        let outcome = pipeline::report_drilldown(ws, &staged_events, &staged_quality, top_n)?;
        info!(latest = %outcome.report_paths.latest.display(), "stage 4/4: drilldown written");
        Some(outcome.report_paths.latest)
    } else {
        info!("stage 4/4: drilldown skipped");
        None
    };

    Ok(RunSummary {
        raw_events,
        raw_quality,
        staged_events,
        staged_quality,
        dq_latest: transformed.dq_report.latest,
        kpi_latest: kpi.report_paths.latest,
        drilldown_latest,
        alerts: kpi.report.alerts,
    })
}

pub(crate) fn cmd_run(
    ws: &Workspace,
    cfg: &GenConfig,
    top_n: usize,
    drilldown: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let summary = or_exit(run_stages(ws, cfg, top_n, drilldown), output, quiet);
    emit(&summary, output, quiet, |s| {
        println!("OK run complete");
        println!(" - raw events:       {}", s.raw_events.display());
        println!(" - raw quality:      {}", s.raw_quality.display());
        println!(" - staged events:    {}", s.staged_events.display());
        println!(" - staged quality:   {}", s.staged_quality.display());
        println!(" - latest dq:        {}", s.dq_latest.display());
        println!(" - latest kpi:       {}", s.kpi_latest.display());
        match &s.drilldown_latest {
            Some(path) => println!(" - latest drilldown: {}", path.display()),
            None => println!(" - drilldown:        (skipped)"),
        }
        for alert in &s.alerts {
            println!("   [{:<7}] {} = {}", alert.level, alert.metric.name(), alert.value);
        }
    });
}
