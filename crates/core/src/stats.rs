//! Descriptive statistics for duration samples.

use serde::{Deserialize, Serialize};

/// Count, mean and two percentiles of a sample. The derived stats are
/// `None` when the sample is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
}

impl DistributionSummary {
    /// Summarize `samples`, rounding every derived stat to 2 decimals.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return DistributionSummary {
                count: 0,
                mean: None,
                p50: None,
                p95: None,
            };
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

        DistributionSummary {
            count: sorted.len(),
            mean: Some(round_to(mean, 2)),
            p50: quantile(&sorted, 0.5).map(|v| round_to(v, 2)),
            p95: quantile(&sorted, 0.95).map(|v| round_to(v, 2)),
        }
    }
}

/// Linear-interpolation quantile over an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
