//! Buy Outlier Detector
//!
//! Statistical test on a trailing buy-activity sample. The last value is
//! compared against a baseline built from every value before it:
//!
//! threshold = mean(baseline) + k * stddev(baseline)
//!
//! The latest value is an outlier when it is strictly above the threshold.
//! With a flat baseline (zero variance) the threshold collapses to the mean,
//! so any strictly greater value is flagged.

use statrs::statistics::Statistics;

/// Minimum number of baseline points needed for a verdict
pub const MIN_BASELINE_LEN: usize = 2;

/// Below this the baseline is treated as flat
const ZERO_VARIANCE_EPSILON: f64 = 1e-12;

/// Verdict plus the baseline figures used to reach it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierReport {
    pub is_outlier: bool,
    /// Most recent sub-interval value
    pub latest: f64,
    pub baseline_mean: f64,
    /// Population standard deviation of the baseline
    pub baseline_std_dev: f64,
    /// mean + k * std_dev
    pub threshold: f64,
}

impl OutlierReport {
    /// How many baseline standard deviations the latest value sits above the mean
    pub fn z_score(&self) -> Option<f64> {
        if self.baseline_std_dev < ZERO_VARIANCE_EPSILON {
            return None;
        }
        Some((self.latest - self.baseline_mean) / self.baseline_std_dev)
    }
}

/// Outcome of the outlier test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlierOutcome {
    Decided(OutlierReport),
    /// Not enough usable data to decide either way
    Inconclusive { baseline_len: usize },
}

impl OutlierOutcome {
    /// `Some(true|false)` when decided, `None` when inconclusive
    pub fn is_outlier(&self) -> Option<bool> {
        match self {
            OutlierOutcome::Decided(report) => Some(report.is_outlier),
            OutlierOutcome::Inconclusive { .. } => None,
        }
    }
}

/// Run the outlier test on `sample` (most recent last) with multiple `k`
pub fn detect(sample: &[f64], k: f64) -> OutlierOutcome {
    let baseline_len = sample.len().saturating_sub(1);

    let usable = k.is_finite()
        && k >= 0.0
        && sample.iter().all(|v| v.is_finite() && *v >= 0.0);

    if !usable || baseline_len < MIN_BASELINE_LEN {
        return OutlierOutcome::Inconclusive { baseline_len };
    }

    let (baseline, latest) = sample.split_at(baseline_len);
    let latest = latest[0];

    let baseline_mean = baseline.iter().mean();
    let mut baseline_std_dev = baseline.iter().population_std_dev();
    if baseline_std_dev < ZERO_VARIANCE_EPSILON {
        baseline_std_dev = 0.0;
    }

    let threshold = baseline_mean + k * baseline_std_dev;

    OutlierOutcome::Decided(OutlierReport {
        is_outlier: latest > threshold,
        latest,
        baseline_mean,
        baseline_std_dev,
        threshold,
    })
}
