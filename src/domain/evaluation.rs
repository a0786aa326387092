//! Criteria Evaluator
//!
//! Applies the threshold checklist to one token's metrics. Checks run in a
//! fixed order and stop at the first failure, so a rejection always names
//! exactly one criterion and the same input always yields the same result:
//!
//! 1. liquidity
//! 2. market cap range
//! 3. top-5 holder concentration
//! 4. holder count
//! 5. 24h volume as a share of market cap
//! 6. buy outlier
//!
//! An inconclusive outlier test makes the whole evaluation inconclusive.

use serde::Serialize;
use std::fmt;

use super::metrics::TokenMetrics;
use super::thresholds::Thresholds;
use crate::strategy::outlier::{self, OutlierOutcome, OutlierReport};

/// A single filter criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Criterion {
    Liquidity,
    MarketCapRange,
    HolderConcentration,
    HolderCount,
    VolumeRatio,
    BuyOutlier,
}

impl Criterion {
    /// Evaluation order
    pub const ORDER: [Criterion; 6] = [
        Criterion::Liquidity,
        Criterion::MarketCapRange,
        Criterion::HolderConcentration,
        Criterion::HolderCount,
        Criterion::VolumeRatio,
        Criterion::BuyOutlier,
    ];

    /// Stable identifier used in logs and scan reports
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Liquidity => "min_liquidity",
            Criterion::MarketCapRange => "mcap_range",
            Criterion::HolderConcentration => "top5_holders_above_th",
            Criterion::HolderCount => "low_holder_count",
            Criterion::VolumeRatio => "min_24h_volume",
            Criterion::BuyOutlier => "no_buy_outlier",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The first failing criterion and the value that failed it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rejection {
    pub criterion: Criterion,
    pub observed: f64,
}

/// Why an evaluation could not reach a verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum InconclusiveReason {
    /// Too few buy-activity points to build a baseline
    InsufficientActivity { baseline_len: usize },
}

impl fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InconclusiveReason::InsufficientActivity { baseline_len } => write!(
                f,
                "insufficient buy activity: {} baseline point(s), need {}",
                baseline_len,
                outlier::MIN_BASELINE_LEN
            ),
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Qualified {
        metrics: TokenMetrics,
        outlier: OutlierReport,
    },
    Rejected(Rejection),
    Inconclusive(InconclusiveReason),
}

impl EvaluationResult {
    pub fn is_qualified(&self) -> bool {
        matches!(self, EvaluationResult::Qualified { .. })
    }

    /// Scan report label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            EvaluationResult::Qualified { .. } => "qualified",
            EvaluationResult::Rejected(rejection) => rejection.criterion.label(),
            EvaluationResult::Inconclusive(_) => "inconclusive",
        }
    }
}

fn reject(criterion: Criterion, observed: f64) -> EvaluationResult {
    EvaluationResult::Rejected(Rejection { criterion, observed })
}

/// Evaluate `metrics` against `thresholds`
pub fn evaluate(metrics: &TokenMetrics, thresholds: &Thresholds) -> EvaluationResult {
    // NaN must fail every comparison, so checks are written as "passes" and negated
    if !(metrics.liquidity_usd >= thresholds.min_liquidity_usd) {
        return reject(Criterion::Liquidity, metrics.liquidity_usd);
    }

    let mcap = metrics.mcap_usd;
    if !(mcap >= thresholds.min_mcap_usd && mcap <= thresholds.max_mcap_usd) {
        return reject(Criterion::MarketCapRange, mcap);
    }

    if !(metrics.top5_holder_pct <= thresholds.max_top5_holder_pct) {
        return reject(Criterion::HolderConcentration, metrics.top5_holder_pct);
    }

    if metrics.holder_count < thresholds.min_holder_count {
        return reject(Criterion::HolderCount, metrics.holder_count as f64);
    }

    if !(mcap > 0.0 && mcap.is_finite()) {
        return reject(Criterion::VolumeRatio, 0.0);
    }
    let volume_pct = metrics.volume_24h_usd / mcap * 100.0;
    if !(volume_pct >= thresholds.min_24h_volume_pct_of_mcap) {
        return reject(Criterion::VolumeRatio, volume_pct);
    }

    match outlier::detect(&metrics.buy_activity, thresholds.outlier_std_multiple) {
        OutlierOutcome::Inconclusive { baseline_len } => {
            EvaluationResult::Inconclusive(InconclusiveReason::InsufficientActivity { baseline_len })
        }
        OutlierOutcome::Decided(report) if !report.is_outlier => {
            reject(Criterion::BuyOutlier, report.latest)
        }
        OutlierOutcome::Decided(report) => EvaluationResult::Qualified {
            metrics: metrics.clone(),
            outlier: report,
        },
    }
}
