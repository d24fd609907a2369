//! weldline-core: KPI, data-quality and alerting core for welding cells.
//!
//! Turns raw robot event and quality-check tables into typed records,
//! audits what was dropped, and computes the KPI, alert and drilldown
//! reports. Every computation here is a pure function of its inputs; file
//! handling lives in `weldline-storage`.
//!
//! # Pipeline
//!
//! - [`clean_events`] / [`clean_quality`] -- validate and deduplicate raw rows
//! - [`build_dq_report`] -- audit raw vs cleaned tables
//! - [`KpiReport::compute`] -- KPI snapshot plus longest downtime
//! - [`KpiReport::with_alerts`] -- classify against [`Thresholds`]
//! - [`build_drilldown`] -- per-cell / per-robot KPIs and worst offenders

pub mod alerts;
pub mod clean;
pub mod downtime;
pub mod dq;
pub mod drilldown;
pub mod error;
pub mod kpi;
pub mod records;
pub mod stats;
pub mod thresholds;
pub mod timestamp;

// ── Convenience re-exports: record types ─────────────────────────────

pub use records::{
    Event, EventType, QualityCheck, QualityResult, RawEvent, RawQualityCheck, Table,
    EVENT_COLUMNS, QUALITY_COLUMNS,
};

// ── Convenience re-exports: pipeline stages ──────────────────────────

pub use alerts::{Alert, Metric, Severity};
pub use clean::{
    clean_events, clean_quality, CleanedEvents, CleanedQuality, RejectReason, Rejection,
};
pub use downtime::{max_downtime_event_seconds, max_downtime_with, ResetPairing};
pub use dq::{build_dq_report, DqReport};
pub use drilldown::{
    build_drilldown, build_drilldown_with, DrilldownReport, DrilldownSummary, DEFAULT_TOP_N,
};
pub use error::ConfigError;
pub use kpi::{compute_kpis, KpiReport, KpiSnapshot};
pub use stats::DistributionSummary;
pub use thresholds::{load_thresholds, ThresholdPair, Thresholds, DEFAULT_CONFIG_PATH};
