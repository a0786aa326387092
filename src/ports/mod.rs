//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Market data (candidate listing and per-token metrics)
//! - Optional on-chain data (age, supply, mint authority)
//! - Alert delivery
//! - Scan journaling and wall-clock time
//!
//! Every port error can be classified as retryable or fatal so the retry
//! executor can treat all external calls the same way.

pub mod market_data;
pub mod chain_data;
pub mod notifier;
pub mod journal;
pub mod clock;
pub mod mocks;

pub use market_data::{MarketDataError, MarketDataPort};
pub use chain_data::{ChainDataError, ChainDataPort};
pub use notifier::{AlertPayload, NotifierPort, NotifyError};
pub use journal::{JournalError, NoopJournal, ScanJournal};
pub use clock::{Clock, SystemClock};

/// How a failed external call should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeout, rate limit, transient network or server error
    Retryable,
    /// Malformed request, auth failure, not found, bad data
    Fatal,
}

/// Errors that know whether retrying can help
pub trait Classify {
    fn classify(&self) -> FailureClass;

    fn is_retryable(&self) -> bool {
        self.classify() == FailureClass::Retryable
    }
}

impl FailureClass {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            408 | 425 | 429 => FailureClass::Retryable,
            500..=599 => FailureClass::Retryable,
            _ => FailureClass::Fatal,
        }
    }
}
