use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

/// The kinds of report the pipeline writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Dq,
    Kpi,
    Drilldown,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Dq, ReportKind::Kpi, ReportKind::Drilldown];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Dq => "dq",
            ReportKind::Kpi => "kpi",
            ReportKind::Drilldown => "drilldown",
        }
    }

    /// File-name prefix shared by every report of this kind.
    pub fn prefix(self) -> String {
        format!("{}_report_", self.as_str())
    }

    pub fn latest_file_name(self) -> String {
        format!("{}latest.json", self.prefix())
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown report kind '{}' (expected dq, kpi or drilldown)", s))
    }
}

/// A `YYYYMMDD_HHMMSS` wall-clock stamp used in file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(String);

impl Stamp {
    pub fn from_datetime(ts: OffsetDateTime) -> Stamp {
        let fmt = format_description!("[year][month][day]_[hour][minute][second]");
        Stamp(ts.format(&fmt).unwrap_or_else(|_| "00000000_000000".to_string()))
    }

    pub fn now() -> Stamp {
        Stamp::from_datetime(OffsetDateTime::now_utc())
    }

    /// Accepts exactly eight digits, an underscore, six digits.
    pub fn parse(s: &str) -> Option<Stamp> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 15
            && bytes[8] == b'_'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_digit());
        well_formed.then(|| Stamp(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one immutable, timestamped report file.
///
/// Ordering is by stamp, then collision suffix, so the maximum is the
/// newest snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotName {
    pub stamp: Stamp,
    /// 0 for the first file written with a given stamp.
    pub suffix: u32,
}

impl SnapshotName {
    pub fn file_name(&self, kind: ReportKind) -> String {
        if self.suffix == 0 {
            format!("{}{}.json", kind.prefix(), self.stamp)
        } else {
            format!("{}{}_{}.json", kind.prefix(), self.stamp, self.suffix)
        }
    }

    /// Parse a file name written by [`SnapshotName::file_name`]. The
    /// "latest" pointer and unrelated files yield `None`.
    pub fn parse(kind: ReportKind, file_name: &str) -> Option<SnapshotName> {
        let rest = file_name
            .strip_prefix(&kind.prefix())?
            .strip_suffix(".json")?;
        let (stamp, suffix) = match rest.get(15..) {
            Some("") => (rest, 0),
            Some(tail) => (&rest[..15], tail.strip_prefix('_')?.parse().ok()?),
            None => return None,
        };
        Some(SnapshotName {
            stamp: Stamp::parse(stamp)?,
            suffix,
        })
    }
}

/// Where a report was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub snapshot: PathBuf,
    pub latest: PathBuf,
}

/// A report read back from disk, with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedReport<T> {
    pub report: T,
    pub source: PathBuf,
}
