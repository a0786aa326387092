//! Moralis Adapter
//!
//! Implementation of the MarketDataPort for the Moralis Solana APIs.
//! Lists graduated pump.fun tokens and aggregates per-token holder,
//! analytics and pair swap data into evaluator metrics.

mod client;
mod mapping;
mod types;

pub use client::{MoralisClient, MoralisConfig};
pub use mapping::{ActivityWindow, SwapHistory, TOP_HOLDER_COUNT};
