//! Moralis API Types
//!
//! Response shapes for the Solana gateway and the deep-index analytics
//! endpoint. Numeric fields arrive either as JSON numbers or as decimal
//! strings depending on the endpoint, so they all go through [`flexible_f64`].

use serde::{Deserialize, Deserializer};

/// Accept a number, a numeric string, or null (as 0.0)
pub fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Ok(n),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Raw::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
        Some(Raw::Null) | None => Ok(0.0),
    }
}

fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = flexible_f64(deserializer)?;
    Ok(if value.is_finite() && value > 0.0 { value as u64 } else { 0 })
}

/// Envelope used by list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ResultPage<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Entry of the graduated-tokens listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraduatedToken {
    pub token_address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub price_usd: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub liquidity: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub fully_diluted_valuation: f64,
    #[serde(default)]
    pub graduated_at: Option<String>,
}

/// Entry of the top-holders list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopHolder {
    pub owner_address: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance_formatted: f64,
    #[serde(default)]
    pub is_contract: bool,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub percentage_relative_to_total_supply: f64,
}

/// Holder statistics
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderStats {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub total_holders: u64,
}

/// Per-window figure keyed "5m", "1h", "6h", "24h"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowFigures {
    #[serde(rename = "5m", default, deserialize_with = "flexible_f64")]
    pub m5: f64,
    #[serde(rename = "1h", default, deserialize_with = "flexible_f64")]
    pub h1: f64,
    #[serde(rename = "6h", default, deserialize_with = "flexible_f64")]
    pub h6: f64,
    #[serde(rename = "24h", default, deserialize_with = "flexible_f64")]
    pub h24: f64,
}

impl WindowFigures {
    pub fn get(&self, key: &str) -> f64 {
        match key {
            "5m" => self.m5,
            "1h" => self.h1,
            "6h" => self.h6,
            "24h" => self.h24,
            _ => 0.0,
        }
    }
}

/// Token analytics from the deep-index API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAnalytics {
    #[serde(default)]
    pub total_buy_volume: WindowFigures,
    #[serde(default)]
    pub total_sell_volume: WindowFigures,
    #[serde(default)]
    pub total_buyers: WindowFigures,
    #[serde(default)]
    pub total_sellers: WindowFigures,
    #[serde(default)]
    pub total_buys: WindowFigures,
    #[serde(default)]
    pub total_sells: WindowFigures,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub usd_price: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub total_liquidity_usd: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub total_fully_diluted_valuation: f64,
}

/// Token pair listing
#[derive(Debug, Clone, Deserialize)]
pub struct PairList {
    #[serde(default)]
    pub pairs: Vec<TokenPair>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub pair_address: String,
    #[serde(default)]
    pub exchange_name: Option<String>,
    #[serde(default)]
    pub pair_label: Option<String>,
}

/// One swap on a pair, as returned by the pair swaps endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSwap {
    /// "buy" or "sell", from the token's point of view
    #[serde(default)]
    pub transaction_type: String,
    /// RFC 3339 block time
    pub block_timestamp: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub total_value_usd: f64,
}

impl PairSwap {
    pub fn is_buy(&self) -> bool {
        self.transaction_type.eq_ignore_ascii_case("buy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graduated_token_accepts_string_numbers() {
        let json = r#"{
            "tokenAddress": "Mint111",
            "name": "Cat",
            "symbol": "CAT",
            "logo": null,
            "priceUsd": "0.000123",
            "liquidity": "45000.5",
            "fullyDilutedValuation": 123000,
            "graduatedAt": "2025-06-01T10:00:00.000Z"
        }"#;

        let token: GraduatedToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.token_address, "Mint111");
        assert_eq!(token.price_usd, 0.000123);
        assert_eq!(token.liquidity, 45000.5);
        assert_eq!(token.fully_diluted_valuation, 123000.0);
        assert!(token.logo.is_none());
    }

    #[test]
    fn test_analytics_missing_windows_default_to_zero() {
        let json = r#"{
            "totalBuyVolume": {"5m": 10.5, "1h": null, "24h": "300"},
            "totalSells": {"24h": 12}
        }"#;

        let analytics: TokenAnalytics = serde_json::from_str(json).unwrap();
        assert_eq!(analytics.total_buy_volume.m5, 10.5);
        assert_eq!(analytics.total_buy_volume.h1, 0.0);
        assert_eq!(analytics.total_buy_volume.h6, 0.0);
        assert_eq!(analytics.total_buy_volume.get("24h"), 300.0);
        assert_eq!(analytics.total_sells.h24, 12.0);
        assert_eq!(analytics.total_buyers.h24, 0.0);
    }

    #[test]
    fn test_bad_numeric_string_is_an_error() {
        let json = r#"{"ownerAddress": "x", "balanceFormatted": "lots"}"#;
        assert!(serde_json::from_str::<TopHolder>(json).is_err());
    }

    #[test]
    fn test_pair_swap_direction() {
        let json = r#"{"result": [
            {"transactionHash": "a", "transactionType": "buy", "blockTimestamp": "2025-06-01T11:59:00.000Z",
             "totalValueUsd": 12.5, "walletAddress": "w1"},
            {"transactionHash": "b", "transactionType": "SELL", "blockTimestamp": "2025-06-01T11:58:00.000Z",
             "totalValueUsd": "40"}
        ], "cursor": "next"}"#;

        let page: ResultPage<PairSwap> = serde_json::from_str(json).unwrap();
        assert_eq!(page.cursor.as_deref(), Some("next"));
        assert!(page.result[0].is_buy());
        assert_eq!(page.result[0].total_value_usd, 12.5);
        assert!(!page.result[1].is_buy());
        assert_eq!(page.result[1].total_value_usd, 40.0);
    }

    #[test]
    fn test_holder_stats_float_count() {
        let stats: HolderStats = serde_json::from_str(r#"{"totalHolders": 512}"#).unwrap();
        assert_eq!(stats.total_holders, 512);
    }
}
