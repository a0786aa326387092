//! JSON file journal
//!
//! One file per alerted token under `alerted_dir`, named after the mint,
//! and one file per completed cycle under `scan_reports_dir`, named after
//! the cycle's finish time.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AlertRecord, CycleReport};
use crate::ports::{JournalError, ScanJournal};

/// Journal that writes pretty-printed JSON files
#[derive(Debug, Clone)]
pub struct JsonJournal {
    alerted_dir: PathBuf,
    scan_reports_dir: PathBuf,
}

impl JsonJournal {
    pub fn new(alerted_dir: impl Into<PathBuf>, scan_reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            alerted_dir: alerted_dir.into(),
            scan_reports_dir: scan_reports_dir.into(),
        }
    }

    pub fn alert_path(&self, token_address: &str) -> PathBuf {
        self.alerted_dir.join(format!("{}.json", token_address))
    }

    pub fn report_path(&self, finished_at: u64) -> PathBuf {
        self.scan_reports_dir.join(format!("{}.json", finished_at))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), JournalError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| JournalError::WriteError(format!("{}: {}", parent.display(), e)))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| JournalError::SerializationError(e.to_string()))?;
    fs::write(path, json).map_err(|e| JournalError::WriteError(format!("{}: {}", path.display(), e)))
}

impl ScanJournal for JsonJournal {
    fn record_alert(&self, record: &AlertRecord) -> Result<(), JournalError> {
        write_json(&self.alert_path(&record.address), record)
    }

    fn record_cycle(&self, report: &CycleReport) -> Result<(), JournalError> {
        write_json(&self.report_path(report.finished_at), &report.tallies)
    }
}
