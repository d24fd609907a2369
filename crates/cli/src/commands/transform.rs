use std::path::Path;

use super::{emit, or_exit, render};
use crate::pipeline::{self, Workspace};
use crate::OutputFormat;

pub(crate) fn cmd_transform(
    ws: &Workspace,
    events: &Path,
    quality: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let transformed = or_exit(pipeline::transform(ws, events, quality), output, quiet);
    emit(&transformed, output, quiet, |t| {
        println!("OK transform complete:");
        println!(" - staged events:  {}", t.staged_events.display());
        println!(" - staged quality: {}", t.staged_quality.display());
        println!(" - dq report:      {}", t.dq_report.snapshot.display());
        println!(" - dq latest:      {}", t.dq_report.latest.display());
        render::dq(&t.dq);
    });
}
