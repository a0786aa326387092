//! Helius RPC Client
//!
//! Fetches on-chain enrichment for qualified tokens over Solana JSON-RPC:
//! supply from `getTokenSupply`, age from the oldest of the last 1000
//! signatures, and mint authority status from `getAccountInfo` (jsonParsed).
//!
//! Each lookup degrades independently. A failed lookup leaves its field as
//! `None`; only when every lookup fails is the first error returned.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use super::types::{AccountData, AccountInfoValue, RpcResponse, SignatureInfo, TokenAmount, WithContext};
use crate::domain::ChainInfo;
use crate::ports::{ChainDataError, ChainDataPort, Clock, SystemClock};

/// Signatures requested when estimating token age
pub const SIGNATURE_LOOKBACK: u32 = 1000;

/// Configuration for the Helius client
#[derive(Debug, Clone)]
pub struct HeliusConfig {
    /// RPC base URL; the API key is appended as a query parameter
    pub rpc_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for HeliusConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.helius-rpc.com".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for Helius JSON-RPC
#[derive(Debug, Clone)]
pub struct HeliusClient {
    config: HeliusConfig,
    http: Client,
}

impl HeliusClient {
    pub fn new(config: HeliusConfig) -> Result<Self, ChainDataError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChainDataError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Total supply in whole tokens
    pub async fn token_supply(&self, mint: &str) -> Result<Option<f64>, ChainDataError> {
        let result: WithContext<TokenAmount> = self.call("getTokenSupply", json!([mint])).await?;
        Ok(result.value.and_then(|amount| amount.ui_amount()))
    }

    /// Block time of the oldest signature among the most recent lookback window
    pub async fn oldest_block_time(&self, mint: &str) -> Result<Option<i64>, ChainDataError> {
        let signatures: Vec<SignatureInfo> = self
            .call(
                "getSignaturesForAddress",
                json!([mint, { "limit": SIGNATURE_LOOKBACK }]),
            )
            .await?;
        Ok(oldest_block_time(&signatures))
    }

    /// Whether the mint authority has been revoked
    pub async fn mint_authority_revoked(&self, mint: &str) -> Result<Option<bool>, ChainDataError> {
        let result: WithContext<AccountInfoValue> = self
            .call("getAccountInfo", json!([mint, { "encoding": "jsonParsed" }]))
            .await?;

        let Some(account) = result.value else {
            return Ok(None);
        };
        match account.data {
            AccountData::Parsed(parsed) if parsed.parsed.account_type == "mint" => {
                Ok(Some(parsed.parsed.info.mint_authority.is_none()))
            }
            _ => Ok(None),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainDataError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.config.rpc_url)
            .query(&[("api-key", &self.config.api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainDataError::Http(status.as_u16()));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainDataError::ParseError(format!("{}: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(ChainDataError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| ChainDataError::ParseError(format!("{}: missing result", method)))
    }
}

/// Oldest block time in a newest-first signature list
fn oldest_block_time(signatures: &[SignatureInfo]) -> Option<i64> {
    signatures.iter().rev().find_map(|s| s.block_time.filter(|t| *t > 0))
}

/// Combine independent lookups into chain info
fn combine(
    supply: Result<Option<f64>, ChainDataError>,
    created_at: Result<Option<i64>, ChainDataError>,
    revoked: Result<Option<bool>, ChainDataError>,
    now: u64,
    mint: &str,
) -> Result<ChainInfo, ChainDataError> {
    if let (Err(e), Err(_), Err(_)) = (&supply, &created_at, &revoked) {
        return Err(e.clone());
    }

    let supply = supply.unwrap_or_else(|e| {
        tracing::warn!("getTokenSupply failed for {}: {}", mint, e);
        None
    });
    let created_at = created_at.unwrap_or_else(|e| {
        tracing::warn!("getSignaturesForAddress failed for {}: {}", mint, e);
        None
    });
    let verified = revoked.unwrap_or_else(|e| {
        tracing::warn!("getAccountInfo failed for {}: {}", mint, e);
        None
    });

    let age_secs = created_at
        .and_then(|t| u64::try_from(t).ok())
        .map(|t| now.saturating_sub(t));

    Ok(ChainInfo {
        age_secs,
        supply,
        verified,
    })
}

#[async_trait]
impl ChainDataPort for HeliusClient {
    async fn fetch_chain_info(&self, token_address: &str) -> Result<ChainInfo, ChainDataError> {
        let (supply, created_at, revoked) = tokio::join!(
            self.token_supply(token_address),
            self.oldest_block_time(token_address),
            self.mint_authority_revoked(token_address),
        );
        combine(supply, created_at, revoked, SystemClock.now(), token_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(block_time: Option<i64>) -> SignatureInfo {
        SignatureInfo {
            signature: "sig".into(),
            block_time,
        }
    }

    #[test]
    fn test_oldest_block_time_skips_missing() {
        let signatures = vec![sig(Some(300)), sig(Some(200)), sig(Some(100)), sig(None)];
        assert_eq!(oldest_block_time(&signatures), Some(100));
        assert_eq!(oldest_block_time(&[]), None);
    }

    #[test]
    fn test_combine_partial_failure() {
        let info = combine(
            Ok(Some(1_000.0)),
            Err(ChainDataError::Transport("reset".into())),
            Ok(Some(true)),
            1_000,
            "mint",
        )
        .unwrap();

        assert_eq!(info.supply, Some(1_000.0));
        assert_eq!(info.age_secs, None);
        assert_eq!(info.verified, Some(true));
    }

    #[test]
    fn test_combine_computes_age() {
        let info = combine(Ok(None), Ok(Some(400)), Ok(None), 1_000, "mint").unwrap();
        assert_eq!(info.age_secs, Some(600));
    }

    #[test]
    fn test_combine_all_failed_returns_first_error() {
        let result = combine(
            Err(ChainDataError::Http(503)),
            Err(ChainDataError::Transport("reset".into())),
            Err(ChainDataError::ParseError("eof".into())),
            1_000,
            "mint",
        );
        assert_eq!(result, Err(ChainDataError::Http(503)));
    }

    #[test]
    fn test_client_creation() {
        let client = HeliusClient::new(HeliusConfig::default());
        assert!(client.is_ok());
    }
}
