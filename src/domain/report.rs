//! Scan Reports
//!
//! Per-cycle outcome tallies and the record kept for each alerted token.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metrics::HolderShare;

pub const OUTCOME_SUPPRESSED: &str = "suppressed";
pub const OUTCOME_FETCH_ERROR: &str = "fetch_error";
pub const OUTCOME_NOTIFY_FAILED: &str = "notify_failed";
pub const OUTCOME_ALERTED: &str = "alerted";

/// Outcome counts for one scan cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: u64,
    pub finished_at: u64,
    pub candidates: usize,
    pub tallies: BTreeMap<String, usize>,
}

impl CycleReport {
    pub fn new(started_at: u64) -> Self {
        Self {
            started_at,
            ..Default::default()
        }
    }

    pub fn tally(&mut self, outcome: &str) {
        *self.tallies.entry(outcome.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, outcome: &str) -> usize {
        self.tallies.get(outcome).copied().unwrap_or(0)
    }
}

/// What gets archived for each alerted token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub address: String,
    pub pool_address: String,
    pub name: String,
    pub symbol: String,
    pub timestamp_alerted: u64,
    pub top_holders: Vec<HolderShare>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tallies_accumulate() {
        let mut report = CycleReport::new(10);
        report.tally(OUTCOME_SUPPRESSED);
        report.tally(OUTCOME_SUPPRESSED);
        report.tally("min_liquidity");

        assert_eq!(report.count(OUTCOME_SUPPRESSED), 2);
        assert_eq!(report.count("min_liquidity"), 1);
        assert_eq!(report.count(OUTCOME_ALERTED), 0);
    }

    #[test]
    fn test_report_serializes_tallies_as_map() {
        let mut report = CycleReport::new(10);
        report.tally("inconclusive");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tallies"]["inconclusive"], 1);
    }
}
