//! Helius RPC Types
//!
//! JSON-RPC envelopes and the result shapes used for chain enrichment.

use serde::Deserialize;

/// JSON-RPC response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Wrapper for results carrying a context slot
#[derive(Debug, Clone, Deserialize)]
pub struct WithContext<T> {
    pub value: Option<T>,
}

/// `getTokenSupply` value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl TokenAmount {
    /// Amount in whole tokens
    pub fn ui_amount(&self) -> Option<f64> {
        if let Some(ui) = self.ui_amount_string.as_deref().and_then(|s| s.parse().ok()) {
            return Some(ui);
        }
        let raw: f64 = self.amount.parse().ok()?;
        Some(raw / 10f64.powi(self.decimals as i32))
    }
}

/// `getSignaturesForAddress` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub block_time: Option<i64>,
}

/// `getAccountInfo` value with jsonParsed encoding
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoValue {
    pub data: AccountData,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountData {
    Parsed(ParsedAccountData),
    Raw(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedAccountData {
    pub parsed: ParsedInfo,
    #[serde(default)]
    pub program: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedInfo {
    pub info: MintInfo,
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Mint account fields we read
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintInfo {
    #[serde(default)]
    pub mint_authority: Option<String>,
    #[serde(default)]
    pub freeze_authority: Option<String>,
}
