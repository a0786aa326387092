//! Helius Adapter
//!
//! Implementation of the ChainDataPort over Helius Solana JSON-RPC.

mod client;
mod types;

pub use client::{HeliusClient, HeliusConfig, SIGNATURE_LOOKBACK};
