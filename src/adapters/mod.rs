//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Moralis: graduated-token listing and per-token market metrics
//! - Helius: on-chain enrichment over Solana JSON-RPC
//! - Telegram: alert delivery
//! - Storage: JSON journal of alerts and cycle reports
//! - CLI: Command-line interface handlers

pub mod moralis;
pub mod helius;
pub mod telegram;
pub mod storage;
pub mod cli;

pub use moralis::MoralisClient;
pub use helius::HeliusClient;
pub use telegram::{LogNotifier, TelegramNotifier};
pub use storage::JsonJournal;
pub use cli::CliApp;
