mod commands;
mod pipeline;
mod synth;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use weldline_core::{ResetPairing, DEFAULT_CONFIG_PATH, DEFAULT_TOP_N};
use weldline_storage::{Layout, ReportKind};

use crate::pipeline::Workspace;
use crate::synth::GenConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Welding cell KPI pipeline.
#[derive(Parser)]
#[command(
    name = "weldline",
    version,
    about = "Welding cell KPI pipeline (synthetic -> staged -> reports)"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Threshold config file (YAML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for generated raw CSVs
    #[arg(long, global = true, default_value = "data/raw")]
    raw_dir: PathBuf,

    /// Directory for cleaned (staged) CSVs
    #[arg(long, global = true, default_value = "data/staged")]
    staged_dir: PathBuf,

    /// Directory for JSON reports
    #[arg(long, global = true, default_value = "data/reports")]
    reports_dir: PathBuf,

    /// How ERROR events are matched to RESET events for downtime
    #[arg(long, global = true, default_value = "nearest", value_enum)]
    reset_pairing: PairingArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PairingArg {
    /// Each ERROR pairs with the first RESET after it
    Nearest,
    /// A RESET clears all pending ERRORs; only the earliest is measured
    FirstErrorOnly,
}

impl From<PairingArg> for ResetPairing {
    fn from(arg: PairingArg) -> Self {
        match arg {
            PairingArg::Nearest => ResetPairing::Nearest,
            PairingArg::FirstErrorOnly => ResetPairing::FirstErrorOnly,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct GenArgs {
    /// Days of history to generate
    #[arg(long, default_value_t = 7)]
    days: u32,
    /// Number of cells
    #[arg(long, default_value_t = 3)]
    cells: u32,
    /// Robots per cell
    #[arg(long, default_value_t = 2)]
    robots: u32,
    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl From<GenArgs> for GenConfig {
    fn from(args: GenArgs) -> Self {
        GenConfig {
            days: args.days,
            cells: args.cells,
            robots_per_cell: args.robots,
            seed: args.seed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic robot events and quality checks
    Generate {
        #[command(flatten)]
        generator: GenArgs,
        /// Output directory (defaults to --raw-dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Clean raw CSVs into staged CSVs and write the DQ report
    Transform {
        /// Raw robot events CSV
        #[arg(long)]
        events: PathBuf,
        /// Raw quality checks CSV
        #[arg(long)]
        quality: PathBuf,
    },

    /// Compute KPIs and alerts and write the KPI report
    ReportKpi {
        /// Staged robot events CSV
        #[arg(long)]
        events: PathBuf,
        /// Staged quality checks CSV
        #[arg(long)]
        quality: PathBuf,
    },

    /// Break KPIs down per cell and robot and write the drilldown report
    ReportDrilldown {
        /// Staged robot events CSV; a path containing '*' picks the newest staged file
        #[arg(long)]
        events: PathBuf,
        /// Staged quality checks CSV; a path containing '*' picks the newest staged file
        #[arg(long)]
        quality: PathBuf,
        /// Length of each worst-offenders list
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },

    /// Run generate, transform, report-kpi and report-drilldown in sequence
    Run {
        #[command(flatten)]
        generator: GenArgs,
        /// Length of each worst-offenders list
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
        /// Skip the drilldown report
        #[arg(long)]
        no_drilldown: bool,
    },

    /// Print the most recent report of a kind (dq, kpi or drilldown)
    Show {
        kind: ReportKind,
    },
}

fn init_tracing(log_json: bool, quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.quiet);

    let ws = Workspace {
        layout: Layout {
            raw_dir: cli.raw_dir,
            staged_dir: cli.staged_dir,
            reports_dir: cli.reports_dir,
        },
        config: cli.config,
        pairing: cli.reset_pairing.into(),
    };

    match cli.command {
        Commands::Generate { generator, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| ws.layout.raw_dir.clone());
            commands::cmd_generate(&generator.into(), &out_dir, cli.output, cli.quiet);
        }
        Commands::Transform { events, quality } => {
            commands::cmd_transform(&ws, &events, &quality, cli.output, cli.quiet);
        }
        Commands::ReportKpi { events, quality } => {
            commands::cmd_report_kpi(&ws, &events, &quality, cli.output, cli.quiet);
        }
        Commands::ReportDrilldown {
            events,
            quality,
            top_n,
        } => {
            commands::cmd_report_drilldown(&ws, &events, &quality, top_n, cli.output, cli.quiet);
        }
        Commands::Run {
            generator,
            top_n,
            no_drilldown,
        } => {
            commands::cmd_run(
                &ws,
                &generator.into(),
                top_n,
                !no_drilldown,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Show { kind } => {
            commands::cmd_show(&ws.layout.reports(), kind, cli.output, cli.quiet);
        }
    }
}

/// Report an error in the selected output format. Silent under `--quiet`
/// in text mode; JSON errors are always printed.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({ "error": msg });
            eprintln!("{}", body);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", msg);
            }
        }
    }
}
