//! Strategy Layer - Statistical signal detection
//!
//! - `outlier`: flags a latest observation sitting more than `k` standard
//!   deviations above its trailing baseline

pub mod outlier;

pub use outlier::{detect, OutlierOutcome, OutlierReport};
