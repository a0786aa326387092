//! Moralis API Client
//!
//! HTTP client for the Moralis Solana gateway and deep-index analytics API.
//! Implements [`MarketDataPort`]: the graduated pump.fun listing becomes the
//! candidate list and per-token endpoints become [`TokenMetrics`].
//!
//! The client does not retry on its own; callers wrap it in the retry
//! executor, and every error is classified for that purpose.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::mapping::{self, ActivityWindow, SwapHistory};
use super::types::{
    GraduatedToken, HolderStats, PairList, PairSwap, ResultPage, TokenAnalytics, TopHolder,
};
use crate::domain::{is_valid_address, TokenCandidate, TokenMetrics};
use crate::ports::{Classify, Clock, MarketDataError, MarketDataPort, SystemClock};

/// Moralis client configuration
#[derive(Debug, Clone)]
pub struct MoralisConfig {
    /// Solana gateway base URL
    pub gateway_url: String,
    /// Deep-index (analytics) base URL
    pub deep_index_url: String,
    pub api_key: String,
    /// Network segment of gateway paths
    pub network: String,
    /// Chain recorded on candidates
    pub chain: String,
    /// Launchpad whose graduates are listed
    pub exchange: String,
    /// Exchange whose pool is preferred when a token has several
    pub preferred_exchange: String,
    /// Tokens requested per listing call
    pub listing_limit: u32,
    pub activity: ActivityWindow,
    /// Swaps requested per page of the pair swaps endpoint
    pub swap_page_size: u32,
    /// Pages fetched per pool before the activity window is cut short
    pub max_swap_pages: u32,
    pub timeout: Duration,
}

impl Default for MoralisConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://solana-gateway.moralis.io".to_string(),
            deep_index_url: "https://deep-index.moralis.io/api/v2.2".to_string(),
            api_key: String::new(),
            network: "mainnet".to_string(),
            chain: "solana".to_string(),
            exchange: "pumpfun".to_string(),
            preferred_exchange: "PumpSwap".to_string(),
            listing_limit: 100,
            activity: ActivityWindow::default(),
            swap_page_size: 100,
            max_swap_pages: 20,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Moralis market data client
pub struct MoralisClient {
    config: MoralisConfig,
    http: Client,
    /// token address -> resolved pool address, limited to the latest listing
    pools: Mutex<HashMap<String, String>>,
}

impl MoralisClient {
    pub fn new(config: MoralisConfig) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketDataError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            pools: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &MoralisConfig {
        &self.config
    }

    /// Recently graduated tokens, in provider order
    pub async fn graduated_tokens(&self) -> Result<Vec<GraduatedToken>, MarketDataError> {
        let url = format!(
            "{}/token/{}/exchange/{}/graduated",
            self.config.gateway_url, self.config.network, self.config.exchange
        );
        let page: ResultPage<GraduatedToken> = self
            .get(&url, &[("limit", self.config.listing_limit.to_string())])
            .await?;
        Ok(page.result)
    }

    pub async fn top_holders(&self, token: &str, limit: u32) -> Result<Vec<TopHolder>, MarketDataError> {
        let url = format!(
            "{}/token/{}/{}/top-holders",
            self.config.gateway_url, self.config.network, token
        );
        let page: ResultPage<TopHolder> = self.get(&url, &[("limit", limit.to_string())]).await?;
        Ok(page.result)
    }

    pub async fn holder_stats(&self, token: &str) -> Result<HolderStats, MarketDataError> {
        let url = format!(
            "{}/token/{}/holders/{}",
            self.config.gateway_url, self.config.network, token
        );
        self.get(&url, &[]).await
    }

    pub async fn token_analytics(&self, token: &str) -> Result<TokenAnalytics, MarketDataError> {
        let url = format!("{}/tokens/{}/analytics", self.config.deep_index_url, token);
        self.get(&url, &[("chain", self.config.chain.clone())]).await
    }

    pub async fn token_pairs(&self, token: &str) -> Result<PairList, MarketDataError> {
        let url = format!(
            "{}/token/{}/{}/pairs",
            self.config.gateway_url, self.config.network, token
        );
        self.get(&url, &[]).await
    }

    /// Swaps on a pool over the activity window, newest first
    pub async fn pool_swaps(&self, pool: &str, now: u64) -> Result<SwapHistory, MarketDataError> {
        let url = format!(
            "{}/token/{}/pairs/{}/swaps",
            self.config.gateway_url, self.config.network, pool
        );
        let from = now.saturating_sub(self.config.activity.span_secs());
        let mut history = SwapHistory::default();
        let mut cursor: Option<String> = None;

        for _ in 0..self.config.max_swap_pages.max(1) {
            let mut query = vec![
                ("limit", self.config.swap_page_size.to_string()),
                ("order", "DESC".to_string()),
                ("fromDate", from.to_string()),
                ("toDate", now.to_string()),
            ];
            if let Some(cursor) = cursor.take() {
                query.push(("cursor", cursor));
            }

            let page: ResultPage<PairSwap> = self.get(&url, &query).await?;
            let exhausted = page.result.is_empty();
            history.swaps.extend(page.result);

            match page.cursor.filter(|c| !c.is_empty()) {
                Some(next) if !exhausted => cursor = Some(next),
                _ => return Ok(history),
            }
        }

        tracing::debug!(
            "Swap history for pool {} cut at {} pages ({} swaps)",
            pool,
            self.config.max_swap_pages,
            history.swaps.len()
        );
        history.truncated = true;
        Ok(history)
    }

    /// Pool for a token, from cache or the pairs endpoint
    pub async fn resolve_pool(&self, token: &str) -> Result<String, MarketDataError> {
        if let Some(pool) = self.cached_pool(token) {
            return Ok(pool);
        }

        let pairs = self.token_pairs(token).await?;
        let pool = mapping::select_pool(&pairs.pairs, &self.config.preferred_exchange)
            .ok_or_else(|| MarketDataError::MissingData(format!("no pairs for token {}", token)))?;

        if let Ok(mut pools) = self.pools.lock() {
            pools.insert(token.to_string(), pool.clone());
        }
        Ok(pool)
    }

    fn cached_pool(&self, token: &str) -> Option<String> {
        self.pools.lock().ok().and_then(|pools| pools.get(token).cloned())
    }

    /// Forget pools of tokens that left the listing
    fn retain_pools(&self, listed: &HashSet<&str>) {
        if let Ok(mut pools) = self.pools.lock() {
            pools.retain(|token, _| listed.contains(token.as_str()));
        }
    }

    /// Resolve a pool for each listed token. Tokens whose pool cannot be
    /// resolved are skipped for this cycle whatever the failure.
    async fn candidates_from(&self, tokens: &[GraduatedToken], discovered_at: u64) -> Vec<TokenCandidate> {
        let listed: HashSet<&str> = tokens.iter().map(|t| t.token_address.as_str()).collect();
        self.retain_pools(&listed);

        let mut candidates = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !is_valid_address(&token.token_address) {
                tracing::warn!("Skipping listing with invalid mint address {}", token.token_address);
                continue;
            }

            let pool = match self.resolve_pool(&token.token_address).await {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::warn!(
                        "No pool for token {} ({}): {}",
                        token.token_address,
                        if e.is_retryable() { "retryable" } else { "fatal" },
                        e
                    );
                    continue;
                }
            };

            candidates.push(
                TokenCandidate::new(&self.config.chain, &token.token_address, pool, discovered_at)
                    .with_listing(mapping::listing_snapshot(token)),
            );
        }
        candidates
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketDataError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::from_status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| MarketDataError::ParseError(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl MarketDataPort for MoralisClient {
    async fn list_candidates(&self) -> Result<Vec<TokenCandidate>, MarketDataError> {
        let tokens = self.graduated_tokens().await?;
        Ok(self.candidates_from(&tokens, SystemClock.now()).await)
    }

    async fn fetch_metrics(&self, candidate: &TokenCandidate) -> Result<TokenMetrics, MarketDataError> {
        let token = candidate.token_address.as_str();
        let now = SystemClock.now();

        let (holders, stats, analytics, swaps) = tokio::try_join!(
            self.top_holders(token, 10),
            self.holder_stats(token),
            self.token_analytics(token),
            self.pool_swaps(&candidate.pool_address, now),
        )?;

        tracing::debug!(
            "Fetched metrics for {}: {} holders, {} swaps",
            token,
            stats.total_holders,
            swaps.swaps.len()
        );

        Ok(mapping::build_metrics(
            candidate,
            &holders,
            stats.total_holders,
            &analytics,
            &swaps,
            now,
            self.config.activity,
        ))
    }
}
