//! Configuration Loader
//!
//! Loads and validates the scanner configuration from a TOML file. Secrets
//! may be left out of the file and supplied through the environment (or a
//! `.env` file) instead.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::helius::HeliusConfig;
use crate::adapters::moralis::{ActivityWindow, MoralisConfig};
use crate::adapters::telegram::TelegramConfig;
use crate::application::{RetryPolicy, ScanSettings};
use crate::domain::Thresholds;

pub const MORALIS_API_KEY_VAR: &str = "MORALIS_API_KEY";
pub const HELIUS_API_KEY_VAR: &str = "HELIUS_API_KEY";
pub const TG_BOT_TOKEN_VAR: &str = "TG_BOT_TOKEN";
pub const TG_CHAT_ID_VAR: &str = "TG_SIGNALS_CHANNEL_ID";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub retry: RetrySection,
    pub moralis: MoralisSection,
    #[serde(default)]
    pub helius: HeliusSection,
    pub telegram: TelegramSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Scan loop timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// Target period of one scan cycle
    pub seconds_between_scans: u64,
    /// Cooldown after an alert is delivered
    pub seconds_to_ignore_after_signal: u64,
    /// Cooldown after a non-retryable metrics failure (0 disables)
    pub seconds_to_ignore_after_error: u64,
    /// Pause after a cycle fails outright
    pub seconds_to_sleep_on_error: u64,
    /// Metric fetches in flight at once
    pub max_concurrent_fetches: usize,
}

impl Default for ScannerSection {
    fn default() -> Self {
        let settings = ScanSettings::default();
        Self {
            seconds_between_scans: settings.seconds_between_scans,
            seconds_to_ignore_after_signal: settings.seconds_to_ignore_after_signal,
            seconds_to_ignore_after_error: settings.seconds_to_ignore_after_error,
            seconds_to_sleep_on_error: settings.seconds_to_sleep_on_error,
            max_concurrent_fetches: settings.max_concurrent_fetches,
        }
    }
}

/// Retry/backoff for provider calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts including the first call
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay
    pub max_delay_secs: u64,
    /// Random extra delay added to each backoff (0 disables)
    pub jitter_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 2_000,
            max_delay_secs: 60,
            jitter_ms: 0,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_secs(self.max_delay_secs))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

/// Moralis market data provider
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MoralisSection {
    pub gateway_url: String,
    pub deep_index_url: String,
    /// Prefer MORALIS_API_KEY in the environment over putting the key here
    pub api_key: Option<String>,
    pub exchange: String,
    pub preferred_exchange: String,
    pub listing_limit: u32,
    /// Span of the buy-activity sample
    pub activity_window_hours: u32,
    /// Width of one buy-activity bucket
    pub activity_bucket_minutes: u32,
    /// Swaps per page when reading a pool's activity
    pub swap_page_size: u32,
    /// Page cap per pool; older buckets are dropped when it is hit
    pub max_swap_pages: u32,
    pub timeout_secs: u64,
}

impl Default for MoralisSection {
    fn default() -> Self {
        let defaults = MoralisConfig::default();
        Self {
            gateway_url: defaults.gateway_url,
            deep_index_url: defaults.deep_index_url,
            api_key: None,
            exchange: defaults.exchange,
            preferred_exchange: defaults.preferred_exchange,
            listing_limit: defaults.listing_limit,
            activity_window_hours: defaults.activity.window_hours,
            activity_bucket_minutes: defaults.activity.bucket_minutes,
            swap_page_size: defaults.swap_page_size,
            max_swap_pages: defaults.max_swap_pages,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl MoralisSection {
    /// Get API key with environment variable fallback
    pub fn get_api_key(&self) -> Option<String> {
        secret_or_env(self.api_key.as_deref(), MORALIS_API_KEY_VAR)
    }

    pub fn client_config(&self) -> Result<MoralisConfig, ConfigError> {
        let api_key = self
            .get_api_key()
            .ok_or(ConfigError::MissingSecret(MORALIS_API_KEY_VAR))?;

        Ok(MoralisConfig {
            gateway_url: self.gateway_url.clone(),
            deep_index_url: self.deep_index_url.clone(),
            api_key,
            exchange: self.exchange.clone(),
            preferred_exchange: self.preferred_exchange.clone(),
            listing_limit: self.listing_limit,
            activity: ActivityWindow {
                window_hours: self.activity_window_hours,
                bucket_minutes: self.activity_bucket_minutes,
            },
            swap_page_size: self.swap_page_size,
            max_swap_pages: self.max_swap_pages,
            timeout: Duration::from_secs(self.timeout_secs),
            ..MoralisConfig::default()
        })
    }
}

/// Helius chain enrichment (optional)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeliusSection {
    pub enabled: bool,
    pub rpc_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HeliusSection {
    fn default() -> Self {
        let defaults = HeliusConfig::default();
        Self {
            enabled: true,
            rpc_url: defaults.rpc_url,
            api_key: None,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl HeliusSection {
    pub fn get_api_key(&self) -> Option<String> {
        secret_or_env(self.api_key.as_deref(), HELIUS_API_KEY_VAR)
    }

    /// Client config, or `None` when enrichment is disabled or has no key
    pub fn client_config(&self) -> Option<HeliusConfig> {
        if !self.enabled {
            return None;
        }
        let api_key = self.get_api_key()?;
        Some(HeliusConfig {
            rpc_url: self.rpc_url.clone(),
            api_key,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

/// Telegram alert channel
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub api_url: String,
    /// Prefer TG_BOT_TOKEN in the environment
    pub bot_token: Option<String>,
    /// Prefer TG_SIGNALS_CHANNEL_ID in the environment
    pub chat_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        let defaults = TelegramConfig::default();
        Self {
            api_url: defaults.api_url,
            bot_token: None,
            chat_id: None,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl TelegramSection {
    pub fn get_bot_token(&self) -> Option<String> {
        secret_or_env(self.bot_token.as_deref(), TG_BOT_TOKEN_VAR)
    }

    pub fn get_chat_id(&self) -> Option<String> {
        secret_or_env(self.chat_id.as_deref(), TG_CHAT_ID_VAR)
    }

    pub fn client_config(&self) -> Result<TelegramConfig, ConfigError> {
        let bot_token = self
            .get_bot_token()
            .ok_or(ConfigError::MissingSecret(TG_BOT_TOKEN_VAR))?;
        let chat_id = self
            .get_chat_id()
            .ok_or(ConfigError::MissingSecret(TG_CHAT_ID_VAR))?;

        Ok(TelegramConfig {
            api_url: self.api_url.clone(),
            bot_token,
            chat_id,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

/// Output locations; `~` is expanded
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// One JSON file per alerted token
    pub alerted_dir: String,
    /// One JSON file per completed cycle
    pub scan_reports_dir: String,
    /// Persisted cooldowns; empty disables persistence
    pub cooldown_file: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            alerted_dir: "alerted_tokens".to_string(),
            scan_reports_dir: "scan_reports".to_string(),
            cooldown_file: "state/cooldowns.json".to_string(),
        }
    }
}

impl StorageSection {
    pub fn alerted_path(&self) -> PathBuf {
        expand(&self.alerted_dir)
    }

    pub fn scan_reports_path(&self) -> PathBuf {
        expand(&self.scan_reports_dir)
    }

    pub fn cooldown_path(&self) -> Option<PathBuf> {
        if self.cooldown_file.trim().is_empty() {
            None
        } else {
            Some(expand(&self.cooldown_file))
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Also write a daily-rolling log file
    pub log_to_file: bool,
    pub log_dir: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_dir: "logs".to_string(),
        }
    }
}

impl LoggingSection {
    pub fn log_path(&self) -> PathBuf {
        expand(&self.log_dir)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Missing secret: set {0} in the environment or the config file")]
    MissingSecret(&'static str),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let scanner = &self.scanner;
        if scanner.seconds_between_scans == 0 {
            return Err(ConfigError::ValidationError(
                "seconds_between_scans must be > 0".to_string(),
            ));
        }
        if scanner.seconds_to_ignore_after_signal == 0 {
            return Err(ConfigError::ValidationError(
                "seconds_to_ignore_after_signal must be > 0".to_string(),
            ));
        }
        if scanner.max_concurrent_fetches == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_fetches must be > 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be > 0".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_secs.saturating_mul(1_000) {
            return Err(ConfigError::ValidationError(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_secs ({})",
                self.retry.base_delay_ms, self.retry.max_delay_secs
            )));
        }

        let moralis = &self.moralis;
        if moralis.listing_limit == 0 {
            return Err(ConfigError::ValidationError(
                "moralis.listing_limit must be > 0".to_string(),
            ));
        }
        if moralis.swap_page_size == 0 || moralis.max_swap_pages == 0 {
            return Err(ConfigError::ValidationError(
                "moralis.swap_page_size and moralis.max_swap_pages must be > 0".to_string(),
            ));
        }
        if moralis.activity_window_hours == 0 || moralis.activity_bucket_minutes == 0 {
            return Err(ConfigError::ValidationError(format!(
                "activity window must be non-empty, got {}h in {}m buckets",
                moralis.activity_window_hours, moralis.activity_bucket_minutes
            )));
        }
        if moralis.activity_bucket_minutes > moralis.activity_window_hours * 60 {
            return Err(ConfigError::ValidationError(format!(
                "activity_bucket_minutes ({}) is wider than the {}h window",
                moralis.activity_bucket_minutes, moralis.activity_window_hours
            )));
        }

        Ok(())
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings::from(&self.scanner)
    }
}

impl From<&ScannerSection> for ScanSettings {
    fn from(section: &ScannerSection) -> Self {
        ScanSettings {
            seconds_between_scans: section.seconds_between_scans,
            seconds_to_ignore_after_signal: section.seconds_to_ignore_after_signal,
            seconds_to_ignore_after_error: section.seconds_to_ignore_after_error,
            seconds_to_sleep_on_error: section.seconds_to_sleep_on_error,
            max_concurrent_fetches: section.max_concurrent_fetches,
        }
    }
}

/// Non-empty configured value, else the environment variable
fn secret_or_env(configured: Option<&str>, var: &str) -> Option<String> {
    if let Some(value) = configured.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(value.to_string());
    }
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
