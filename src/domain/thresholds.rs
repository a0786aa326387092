//! Evaluation Thresholds
//!
//! Static filter configuration. Loaded once at startup and read-only for
//! the lifetime of the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("{field} must be a finite, non-negative number, got {value}")]
    Invalid { field: &'static str, value: f64 },
    #[error("min_mcap_usd ({min}) must not exceed max_mcap_usd ({max})")]
    McapRange { min: f64, max: f64 },
}

/// Multi-criteria filter thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum pool liquidity in USD
    pub min_liquidity_usd: f64,
    /// Lower bound of the market cap range (inclusive)
    pub min_mcap_usd: f64,
    /// Upper bound of the market cap range (inclusive)
    pub max_mcap_usd: f64,
    /// Maximum share of supply held by the top 5 holders (percent)
    pub max_top5_holder_pct: f64,
    /// Minimum number of holders
    pub min_holder_count: u64,
    /// Minimum 24h volume as a percentage of market cap
    pub min_24h_volume_pct_of_mcap: f64,
    /// Standard deviations above the baseline for a buy outlier
    pub outlier_std_multiple: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 10_000.0,
            min_mcap_usd: 100_000.0,
            max_mcap_usd: 10_000_000.0,
            max_top5_holder_pct: 50.0,
            min_holder_count: 100,
            min_24h_volume_pct_of_mcap: 5.0,
            outlier_std_multiple: 2.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let fields = [
            ("min_liquidity_usd", self.min_liquidity_usd),
            ("min_mcap_usd", self.min_mcap_usd),
            ("max_mcap_usd", self.max_mcap_usd),
            ("max_top5_holder_pct", self.max_top5_holder_pct),
            ("min_24h_volume_pct_of_mcap", self.min_24h_volume_pct_of_mcap),
            ("outlier_std_multiple", self.outlier_std_multiple),
        ];

        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ThresholdError::Invalid { field, value });
            }
        }

        if self.min_mcap_usd > self.max_mcap_usd {
            return Err(ThresholdError::McapRange {
                min: self.min_mcap_usd,
                max: self.max_mcap_usd,
            });
        }

        Ok(())
    }
}
