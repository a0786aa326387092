use thiserror::Error;

use crate::domain::{AlertRecord, CycleReport};

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to write journal entry: {0}")]
    WriteError(String),

    #[error("Failed to serialize journal entry: {0}")]
    SerializationError(String),
}

/// Record of what the scanner did. Failures here are logged, never fatal.
pub trait ScanJournal: Send + Sync {
    fn record_alert(&self, record: &AlertRecord) -> Result<(), JournalError>;

    fn record_cycle(&self, report: &CycleReport) -> Result<(), JournalError>;
}

/// Journal that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopJournal;

impl ScanJournal for NoopJournal {
    fn record_alert(&self, _record: &AlertRecord) -> Result<(), JournalError> {
        Ok(())
    }

    fn record_cycle(&self, _report: &CycleReport) -> Result<(), JournalError> {
        Ok(())
    }
}
