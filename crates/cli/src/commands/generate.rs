use std::path::Path;

use super::{emit, or_exit};
use crate::pipeline;
use crate::synth::GenConfig;
use crate::OutputFormat;

pub(crate) fn cmd_generate(cfg: &GenConfig, out_dir: &Path, output: OutputFormat, quiet: bool) {
    let generated = or_exit(pipeline::generate(cfg, out_dir), output, quiet);
    emit(&generated, output, quiet, |g| {
        println!("OK generated files:");
        println!(" - {} ({} rows)", g.events.display(), g.event_rows);
        println!(" - {} ({} rows)", g.quality.display(), g.quality_rows);
    });
}
