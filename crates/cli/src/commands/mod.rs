mod generate;
mod render;
mod report;
mod run;
mod show;
mod transform;

pub(crate) use generate::cmd_generate;
pub(crate) use report::{cmd_report_drilldown, cmd_report_kpi};
pub(crate) use run::cmd_run;
pub(crate) use show::cmd_show;
pub(crate) use transform::cmd_transform;

use std::process;

use serde::Serialize;

use crate::{report_error, OutputFormat};

/// Unwrap a stage result, or report the error and exit 1.
fn or_exit<T>(result: Result<T, String>, output: OutputFormat, quiet: bool) -> T {
    match result {
        Ok(value) => value,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}

/// Print `value` as JSON, or run `text` unless quiet.
fn emit<T: Serialize>(value: &T, output: OutputFormat, quiet: bool, text: impl FnOnce(&T)) {
    match output {
        OutputFormat::Json => print_json(value),
        OutputFormat::Text => {
            if !quiet {
                text(value);
            }
        }
    }
}
