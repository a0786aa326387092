//! Domain Layer - Core scanning logic for the DEX scanner
//!
//! Pure types and rules with no I/O beyond the cooldown file.
//! All provider interactions happen through the ports layer.
//!
//! - `candidate`: token/pool pairs surfaced by a listing
//! - `metrics`: per-token snapshot fed to the evaluator
//! - `thresholds`: filter limits
//! - `evaluation`: the ordered criteria checklist
//! - `cooldown`: per-candidate suppression with JSON persistence
//! - `report`: cycle tallies and alert records

pub mod candidate;
pub mod metrics;
pub mod thresholds;
pub mod evaluation;
pub mod cooldown;
pub mod report;

pub use candidate::{is_valid_address, CandidateKey, ListingSnapshot, TokenCandidate};
pub use metrics::{ChainInfo, HolderShare, TokenMetrics, TokenProfile, TradeWindow, WindowStats};
pub use thresholds::{ThresholdError, Thresholds};
pub use evaluation::{evaluate, Criterion, EvaluationResult, InconclusiveReason, Rejection};
pub use cooldown::{CooldownEntry, CooldownError, CooldownStore};
pub use report::{AlertRecord, CycleReport};
