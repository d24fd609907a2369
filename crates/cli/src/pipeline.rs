//! Pipeline stages.
//!
//! Each stage reads its inputs from disk, runs the pure computations from
//! `weldline-core`, and persists its outputs through `weldline-storage`.
//! Stages return plain `String` errors; the subcommand wrappers decide how
//! to report them.

use std::path::{Path, PathBuf};

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use weldline_core::{
    build_drilldown_with, build_dq_report, clean_events, clean_quality, load_thresholds,
    DqReport, DrilldownReport, Event, KpiReport, QualityCheck, ResetPairing, Table, Thresholds,
};
use weldline_storage::tables::{self, pick_latest_file, pick_latest_file_excluding};
use weldline_storage::{
    Layout, ReportKind, Stamp, WrittenReport, RAW_EVENTS_PREFIX, RAW_QUALITY_PREFIX,
    STAGED_EVENTS_PREFIX, STAGED_QUALITY_PREFIX,
};

use crate::synth::{self, GenConfig};

/// Directories and settings shared by every stage.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    pub layout: Layout,
    pub config: PathBuf,
    pub pairing: ResetPairing,
}

impl Workspace {
    /// Thresholds from the config file, or `None` (hardcoded defaults) when
    /// it cannot be loaded.
    pub fn thresholds(&self) -> Option<Thresholds> {
        load_thresholds(&self.config)
            .map_err(|e| warn!(error = %e, "threshold config not loaded, using defaults"))
            .ok()
    }

    pub fn ensure(&self) -> Result<(), String> {
        self.layout.ensure().map_err(|e| e.to_string())
    }

    /// Newest raw pair. Staged files are skipped even when both stages
    /// share a directory.
    pub fn latest_raw(&self) -> Result<(PathBuf, PathBuf), String> {
        let dir = &self.layout.raw_dir;
        let events =
            pick_latest_file_excluding(dir, RAW_EVENTS_PREFIX, STAGED_EVENTS_PREFIX, ".csv")
                .map_err(|e| e.to_string())?;
        let quality =
            pick_latest_file_excluding(dir, RAW_QUALITY_PREFIX, STAGED_QUALITY_PREFIX, ".csv")
                .map_err(|e| e.to_string())?;
        Ok((events, quality))
    }

    pub fn latest_staged(&self) -> Result<(PathBuf, PathBuf), String> {
        latest_pair(
            &self.layout.staged_dir,
            STAGED_EVENTS_PREFIX,
            STAGED_QUALITY_PREFIX,
        )
    }

    /// A path containing `*` is replaced by the newest staged file with
    /// `prefix`, instead of being passed on as a literal name.
    pub fn resolve_staged(&self, path: &Path, prefix: &str) -> Result<PathBuf, String> {
        if path.to_string_lossy().contains('*') {
            let latest = pick_latest_file(&self.layout.staged_dir, prefix, ".csv")
                .map_err(|e| e.to_string())?;
            info!(
                pattern = %path.display(),
                resolved = %latest.display(),
                "wildcard input resolved"
            );
            Ok(latest)
        } else {
            Ok(path.to_path_buf())
        }
    }
}

fn latest_pair(dir: &Path, events: &str, quality: &str) -> Result<(PathBuf, PathBuf), String> {
    let events = pick_latest_file(dir, events, ".csv").map_err(|e| e.to_string())?;
    let quality = pick_latest_file(dir, quality, ".csv").map_err(|e| e.to_string())?;
    Ok((events, quality))
}

/// Paths of a report written to the store.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportPaths {
    pub snapshot: PathBuf,
    pub latest: PathBuf,
}

impl From<WrittenReport> for ReportPaths {
    fn from(w: WrittenReport) -> Self {
        ReportPaths {
            snapshot: w.snapshot,
            latest: w.latest,
        }
    }
}

fn write_report<T: Serialize>(
    ws: &Workspace,
    kind: ReportKind,
    report: &T,
    stamp: &Stamp,
) -> Result<ReportPaths, String> {
    ws.layout
        .reports()
        .write_stamped(kind, report, stamp)
        .map(ReportPaths::from)
        .map_err(|e| format!("failed to write {} report: {}", kind, e))
}

// ── Generate ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Generated {
    pub events: PathBuf,
    pub quality: PathBuf,
    pub event_rows: usize,
    pub quality_rows: usize,
}

/// Generate a synthetic dataset ending now and write it to `out_dir`.
pub(crate) fn generate(cfg: &GenConfig, out_dir: &Path) -> Result<Generated, String> {
    info!(?cfg, out_dir = %out_dir.display(), "generating synthetic data");
    let now = OffsetDateTime::now_utc();
    let data = synth::generate(cfg, now);

    let stamp = Stamp::from_datetime(now);
    let events = out_dir.join(format!("{}{}.csv", RAW_EVENTS_PREFIX, stamp));
    let quality = out_dir.join(format!("{}{}.csv", RAW_QUALITY_PREFIX, stamp));

    let event_rows = tables::write_events(&events, &data.events).map_err(|e| e.to_string())?;
    let quality_rows =
        tables::write_quality(&quality, &data.quality).map_err(|e| e.to_string())?;

    Ok(Generated {
        events,
        quality,
        event_rows,
        quality_rows,
    })
}

// ── Transform ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Transformed {
    pub staged_events: PathBuf,
    pub staged_quality: PathBuf,
    pub dq_report: ReportPaths,
    pub dq: DqReport,
}

/// Clean raw inputs, write the staged CSVs and the DQ report.
pub(crate) fn transform(
    ws: &Workspace,
    events: &Path,
    quality: &Path,
) -> Result<Transformed, String> {
    ws.ensure()?;
    let stamp = Stamp::now();

    let events_raw = tables::read_events(events).map_err(|e| e.to_string())?;
    let quality_raw = tables::read_quality(quality).map_err(|e| e.to_string())?;

    let events_clean = clean_events(&events_raw);
    let quality_clean = clean_quality(&quality_raw);
    let dq = build_dq_report(
        &events_raw,
        events_clean.events(),
        &quality_raw,
        quality_clean.checks(),
    );

    let (staged_events, staged_quality) = ws.layout.staged_paths(&stamp);
    tables::write_staged_events(&staged_events, events_clean.events())
        .map_err(|e| e.to_string())?;
    tables::write_staged_quality(&staged_quality, quality_clean.checks())
        .map_err(|e| e.to_string())?;

    let dq_report = write_report(ws, ReportKind::Dq, &dq, &stamp)?;

    Ok(Transformed {
        staged_events,
        staged_quality,
        dq_report,
        dq,
    })
}

// ── Reports ──────────────────────────────────────────────────────────

/// Read and clean a pair of (usually staged) CSVs.
///
/// Staged files are already clean, so this only re-types them; raw files
/// are accepted too and get cleaned on the way in.
fn load_clean(
    events: &Path,
    quality: &Path,
) -> Result<(Table<Event>, Table<QualityCheck>), String> {
    let events_raw = tables::read_events(events).map_err(|e| e.to_string())?;
    let quality_raw = tables::read_quality(quality).map_err(|e| e.to_string())?;
    Ok((
        clean_events(&events_raw).table,
        clean_quality(&quality_raw).table,
    ))
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct KpiOutcome {
    pub report_paths: ReportPaths,
    pub report: KpiReport,
}

/// Compute KPIs, downtime and alerts, and write the KPI report.
pub(crate) fn report_kpi(
    ws: &Workspace,
    events: &Path,
    quality: &Path,
) -> Result<KpiOutcome, String> {
    ws.ensure()?;
    let stamp = Stamp::now();

    let (events, quality) = load_clean(events, quality)?;
    let thresholds = ws.thresholds();
    let report = KpiReport::compute_with(&events.rows, &quality.rows, ws.pairing)
        .with_alerts(thresholds.as_ref());

    let report_paths = write_report(ws, ReportKind::Kpi, &report, &stamp)?;
    Ok(KpiOutcome {
        report_paths,
        report,
    })
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DrilldownOutcome {
    pub report_paths: ReportPaths,
    pub used_events: PathBuf,
    pub used_quality: PathBuf,
    pub report: DrilldownReport,
}

/// Build and write the per-cell / per-robot drilldown.
pub(crate) fn report_drilldown(
    ws: &Workspace,
    events: &Path,
    quality: &Path,
    top_n: usize,
) -> Result<DrilldownOutcome, String> {
    ws.ensure()?;
    let now = OffsetDateTime::now_utc();
    let stamp = Stamp::from_datetime(now);

    let used_events = ws.resolve_staged(events, STAGED_EVENTS_PREFIX)?;
    let used_quality = ws.resolve_staged(quality, STAGED_QUALITY_PREFIX)?;
    let (events, quality) = load_clean(&used_events, &used_quality)?;

    let generated_at = generated_at(now);
    let report = build_drilldown_with(&events, &quality, top_n, &generated_at, ws.pairing);
    if let Some(error) = report.error() {
        warn!(reason = error, "drilldown degraded");
    }

    let report_paths = write_report(ws, ReportKind::Drilldown, &report, &stamp)?;
    Ok(DrilldownOutcome {
        report_paths,
        used_events,
        used_quality,
        report,
    })
}

/// RFC 3339 at whole-second precision.
fn generated_at(now: OffsetDateTime) -> String {
    let now = now.replace_nanosecond(0).unwrap_or(now);
    now.format(&Rfc3339).unwrap_or_else(|_| now.to_string())
}
