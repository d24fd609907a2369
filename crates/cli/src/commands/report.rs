use std::path::Path;

use super::{emit, or_exit, render};
use crate::pipeline::{self, Workspace};
use crate::OutputFormat;

pub(crate) fn cmd_report_kpi(
    ws: &Workspace,
    events: &Path,
    quality: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let outcome = or_exit(pipeline::report_kpi(ws, events, quality), output, quiet);
    emit(&outcome, output, quiet, |o| {
        println!("OK KPI report generated:");
        println!(" - {}", o.report_paths.snapshot.display());
        println!(" - {}", o.report_paths.latest.display());
        render::kpi(&o.report);
    });
}

pub(crate) fn cmd_report_drilldown(
    ws: &Workspace,
    events: &Path,
    quality: &Path,
    top_n: usize,
    output: OutputFormat,
    quiet: bool,
) {
    let outcome = or_exit(
        pipeline::report_drilldown(ws, events, quality, top_n),
        output,
        quiet,
    );
    emit(&outcome, output, quiet, |o| {
        println!("OK drilldown report generated:");
        println!(" - {}", o.report_paths.snapshot.display());
        println!(" - {}", o.report_paths.latest.display());
        println!(" - used events:  {}", o.used_events.display());
        println!(" - used quality: {}", o.used_quality.display());
        render::drilldown(&o.report);
    });
}
