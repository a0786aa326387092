//! DEX Scanner - graduated-token evaluation and deduplication engine
//!
//! Periodically lists newly graduated Solana tokens, filters them on
//! liquidity, market cap, holder distribution and volume, detects buy
//! outliers, and alerts at most once per cooldown window.
//!
//! # Modules
//!
//! - `domain`: Candidates, metrics, thresholds, evaluation, cooldowns
//! - `ports`: Trait abstractions (MarketDataPort, ChainDataPort, NotifierPort, ScanJournal, Clock)
//! - `strategy`: Buy-outlier detection
//! - `adapters`: External implementations (Moralis, Helius, Telegram, storage, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Scan orchestrator, retry executor, alert rendering

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
