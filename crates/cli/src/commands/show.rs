use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use weldline_core::{DqReport, DrilldownReport, KpiReport};
use weldline_storage::{ReportKind, ReportStore};

use super::{emit, render};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct Shown {
    kind: ReportKind,
    source: Option<PathBuf>,
    report: Option<Value>,
}

/// Render `report` with the typed summary when it has every field, and
/// field by field when it is only partially populated.
fn render_report<T: DeserializeOwned>(kind: ReportKind, report: &Value, text: fn(&T)) {
    match serde_json::from_value::<T>(report.clone()) {
        Ok(typed) => text(&typed),
        Err(e) => {
            debug!(kind = %kind, error = %e, "partial report, rendering raw fields");
            render::partial(report);
        }
    }
}

fn show<T: DeserializeOwned>(
    store: &ReportStore,
    kind: ReportKind,
    output: OutputFormat,
    quiet: bool,
    text: fn(&T),
) {
    let shown = match store.read_latest::<Value>(kind) {
        Some(loaded) => Shown {
            kind,
            source: Some(loaded.source),
            report: Some(loaded.report),
        },
        None => Shown {
            kind,
            source: None,
            report: None,
        },
    };

    emit(&shown, output, quiet, |s| match (&s.source, &s.report) {
        (Some(source), Some(report)) => {
            println!("{} report ({})", kind, source.display());
            render_report(kind, report, text);
        }
        _ => println!("no {} report in {}", kind, store.root().display()),
    });
}

/// Print the most recent report of `kind`. A missing report is not an
/// error, and a report with missing fields is shown with what it has.
pub(crate) fn cmd_show(store: &ReportStore, kind: ReportKind, output: OutputFormat, quiet: bool) {
    match kind {
        ReportKind::Dq => show::<DqReport>(store, kind, output, quiet, render::dq),
        ReportKind::Kpi => show::<KpiReport>(store, kind, output, quiet, render::kpi),
        ReportKind::Drilldown => {
            show::<DrilldownReport>(store, kind, output, quiet, render::drilldown)
        }
    }
}
