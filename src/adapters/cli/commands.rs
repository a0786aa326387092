//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the scanner.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::helius::HeliusClient;
use crate::adapters::moralis::MoralisClient;
use crate::adapters::storage::JsonJournal;
use crate::adapters::telegram::{LogNotifier, TelegramNotifier};
use crate::application::{shutdown_channel, CycleError, ScanOrchestrator, ShutdownSignal};
use crate::config::Config;
use crate::domain::{is_valid_address, CooldownStore, CycleReport, EvaluationResult};
use crate::ports::{Clock, MarketDataPort, NotifierPort, SystemClock};

pub const DEFAULT_CONFIG_PATH: &str = "config/solana.toml";

/// DEX Scanner - graduated-token filter with buy-outlier alerts
#[derive(Parser, Debug)]
#[command(
    name = "dex-scanner",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Graduated-token scanner with buy-outlier alerts",
    long_about = "Scans newly graduated pump.fun tokens on a fixed cadence, filters them \
                  on liquidity, market cap, holder distribution and volume, and alerts \
                  once per cooldown when buying activity spikes above its baseline."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the scan loop
    Run(RunCmd),

    /// Evaluate one listed token without alerting
    Evaluate(EvaluateCmd),

    /// List persisted cooldowns
    Cooldowns(CooldownsCmd),

    /// Validate the configuration file and secrets
    CheckConfig(CheckConfigCmd),
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Run(cmd) => &cmd.config,
            Command::Evaluate(cmd) => &cmd.config,
            Command::Cooldowns(cmd) => &cmd.config,
            Command::CheckConfig(cmd) => &cmd.config,
        }
    }
}

/// Start the scan loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log alerts instead of sending them to Telegram
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}

/// Evaluate one token
#[derive(Parser, Debug)]
pub struct EvaluateCmd {
    /// Token mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// List cooldowns
#[derive(Parser, Debug)]
pub struct CooldownsCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct CheckConfigCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Execute the CLI command against a loaded configuration
pub async fn execute(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Run(cmd) => run_command(cmd, config).await,
        Command::Evaluate(cmd) => evaluate_command(cmd, config).await,
        Command::Cooldowns(_) => cooldowns_command(config),
        Command::CheckConfig(cmd) => check_config_command(cmd, config),
    }
}

/// Handle run command
async fn run_command(cmd: RunCmd, config: Config) -> Result<()> {
    tracing::info!("Starting DEX scanner...");
    tracing::info!("Config: {}", cmd.config.display());

    let notifier: Arc<dyn NotifierPort> = if cmd.dry_run {
        tracing::warn!("DRY RUN mode - alerts are logged, not sent");
        Arc::new(LogNotifier)
    } else {
        let telegram = config
            .telegram
            .client_config()
            .context("Telegram credentials are required unless --dry-run is set")?;
        Arc::new(TelegramNotifier::new(telegram).context("Failed to create Telegram client")?)
    };

    let cooldown_path = config.storage.cooldown_path();
    let cooldowns = match &cooldown_path {
        Some(path) => CooldownStore::load(path)
            .with_context(|| format!("Failed to load cooldowns from {}", path.display()))?,
        None => CooldownStore::new(),
    };
    tracing::info!("Loaded {} persisted cooldown(s)", cooldowns.len());

    let (handle, shutdown) = shutdown_channel();
    let mut orchestrator = build_orchestrator(&config, notifier, shutdown)?
        .with_journal(Arc::new(JsonJournal::new(
            config.storage.alerted_path(),
            config.storage.scan_reports_path(),
        )))
        .with_cooldowns(cooldowns, cooldown_path);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, finishing current step...");
            handle.trigger();
        }
    });

    if cmd.once {
        match single_cycle_outcome(orchestrator.run_cycle().await)? {
            Some(report) => print_report(&report),
            None => println!("Scan interrupted before the cycle finished"),
        }
        return Ok(());
    }

    orchestrator
        .run()
        .await
        .context("Scanner could not start")?;

    let status = orchestrator.status();
    tracing::info!(
        "Scanner stopped after {} cycle(s), {} active cooldown(s)",
        status.cycles_completed,
        status.active_cooldowns
    );
    Ok(())
}

/// A Ctrl-C during a single cycle is a clean stop, not a failure
fn single_cycle_outcome(result: Result<CycleReport, CycleError>) -> Result<Option<CycleReport>> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(CycleError::Cancelled) => {
            tracing::info!("Scan cycle interrupted by shutdown");
            Ok(None)
        }
        Err(e) => Err(e).context("Scan cycle failed"),
    }
}

/// Handle evaluate command
async fn evaluate_command(cmd: EvaluateCmd, config: Config) -> Result<()> {
    if !is_valid_address(&cmd.token) {
        bail!("'{}' is not a valid Solana address", cmd.token);
    }

    let (_handle, shutdown) = shutdown_channel();
    let moralis = Arc::new(moralis_client(&config)?);
    let orchestrator = build_orchestrator_with(&config, moralis.clone(), Arc::new(LogNotifier), shutdown);

    let candidates = moralis
        .list_candidates()
        .await
        .context("Failed to fetch the graduated listing")?;
    let Some(candidate) = candidates.iter().find(|c| c.token_address == cmd.token) else {
        bail!(
            "Token {} is not in the current graduated listing ({} tokens)",
            cmd.token,
            candidates.len()
        );
    };

    let result = orchestrator
        .evaluate_candidate(candidate)
        .await
        .with_context(|| format!("Failed to fetch metrics for {}", candidate.key()))?;

    println!("Candidate: {}", candidate.key());
    match &result {
        EvaluationResult::Qualified { metrics, outlier } => {
            println!("Verdict:   QUALIFIED");
            println!("  Liquidity:    ${:.0}", metrics.liquidity_usd);
            println!("  Market cap:   ${:.0}", metrics.mcap_usd);
            println!("  Holders:      {}", metrics.holder_count);
            println!("  Top 5 share:  {:.2}%", metrics.top5_holder_pct);
            println!(
                "  Latest buys:  {:.2} (baseline {:.2} ± {:.2}, threshold {:.2})",
                outlier.latest, outlier.baseline_mean, outlier.baseline_std_dev, outlier.threshold
            );
        }
        EvaluationResult::Rejected(rejection) => {
            println!("Verdict:   REJECTED on {}", rejection.criterion);
            println!("  Observed: {:.2}", rejection.observed);
        }
        EvaluationResult::Inconclusive(reason) => {
            println!("Verdict:   INCONCLUSIVE ({})", reason);
        }
    }
    Ok(())
}

/// Handle cooldowns command
fn cooldowns_command(config: Config) -> Result<()> {
    let Some(path) = config.storage.cooldown_path() else {
        println!("Cooldown persistence is disabled (storage.cooldown_file is empty)");
        return Ok(());
    };

    let store = CooldownStore::load(&path)
        .with_context(|| format!("Failed to load cooldowns from {}", path.display()))?;
    let now = SystemClock.now();

    let mut active: Vec<_> = store
        .entries()
        .into_iter()
        .filter(|entry| entry.expires_at > now)
        .collect();
    active.sort_by_key(|entry| entry.expires_at);

    if active.is_empty() {
        println!("No active cooldowns in {}", path.display());
        return Ok(());
    }

    println!("Active cooldowns ({}):", active.len());
    for entry in active {
        println!(
            "  {}  until {}  ({} left)",
            entry.key,
            format_timestamp(entry.expires_at),
            format_remaining(entry.expires_at - now)
        );
    }
    Ok(())
}

/// Handle check-config command
fn check_config_command(cmd: CheckConfigCmd, config: Config) -> Result<()> {
    println!("Configuration OK: {}", cmd.config.display());
    println!();
    println!("  Scan interval:       {}s", config.scanner.seconds_between_scans);
    println!("  Signal cooldown:     {}s", config.scanner.seconds_to_ignore_after_signal);
    println!("  Error cooldown:      {}s", config.scanner.seconds_to_ignore_after_error);
    println!("  Concurrent fetches:  {}", config.scanner.max_concurrent_fetches);
    println!("  Retry attempts:      {}", config.retry.max_attempts);
    println!(
        "  Liquidity >=         ${:.0}",
        config.thresholds.min_liquidity_usd
    );
    println!(
        "  Market cap range:    ${:.0} - ${:.0}",
        config.thresholds.min_mcap_usd, config.thresholds.max_mcap_usd
    );
    println!("  Outlier multiple:    {}σ", config.thresholds.outlier_std_multiple);
    println!();
    println!("  Moralis API key:     {}", presence(config.moralis.get_api_key().is_some()));
    println!(
        "  Helius enrichment:   {}",
        if config.helius.client_config().is_some() { "enabled" } else { "disabled" }
    );
    println!("  Telegram bot token:  {}", presence(config.telegram.get_bot_token().is_some()));
    println!("  Telegram chat id:    {}", presence(config.telegram.get_chat_id().is_some()));

    config.moralis.client_config()?;
    config.telegram.client_config()?;
    Ok(())
}

fn moralis_client(config: &Config) -> Result<MoralisClient> {
    let moralis = config.moralis.client_config()?;
    MoralisClient::new(moralis).context("Failed to create Moralis client")
}

fn build_orchestrator(
    config: &Config,
    notifier: Arc<dyn NotifierPort>,
    shutdown: ShutdownSignal,
) -> Result<ScanOrchestrator> {
    let market = Arc::new(moralis_client(config)?);
    Ok(build_orchestrator_with(config, market, notifier, shutdown))
}

fn build_orchestrator_with(
    config: &Config,
    market: Arc<dyn MarketDataPort>,
    notifier: Arc<dyn NotifierPort>,
    shutdown: ShutdownSignal,
) -> ScanOrchestrator {
    let orchestrator = ScanOrchestrator::new(
        market,
        notifier,
        config.thresholds.clone(),
        config.scan_settings(),
        shutdown,
    )
    .with_retry_policy(config.retry.policy());

    match config.helius.client_config().map(HeliusClient::new) {
        Some(Ok(helius)) => orchestrator.with_chain_data(Arc::new(helius)),
        Some(Err(e)) => {
            tracing::warn!("Helius client unavailable, skipping enrichment: {}", e);
            orchestrator
        }
        None => {
            tracing::info!("Helius enrichment disabled");
            orchestrator
        }
    }
}

fn print_report(report: &CycleReport) {
    println!(
        "Cycle finished in {}s: {} candidate(s)",
        report.finished_at.saturating_sub(report.started_at),
        report.candidates
    );
    for (outcome, count) in &report.tallies {
        println!("  {:<24} {}", outcome, count);
    }
}

fn presence(found: bool) -> &'static str {
    if found {
        "set"
    } else {
        "MISSING"
    }
}

/// Format a Unix timestamp for display
fn format_timestamp(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("timestamp: {}", ts))
}

fn format_remaining(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h{:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
