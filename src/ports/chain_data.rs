use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::{Classify, FailureClass};
use crate::domain::ChainInfo;

/// Chain data error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainDataError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC returned HTTP {0}")]
    Http(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to parse RPC response: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for ChainDataError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => ChainDataError::Http(status.as_u16()),
            None if error.is_decode() => ChainDataError::ParseError(error.to_string()),
            None => ChainDataError::Transport(error.to_string()),
        }
    }
}

impl Classify for ChainDataError {
    fn classify(&self) -> FailureClass {
        match self {
            ChainDataError::Transport(_) => FailureClass::Retryable,
            ChainDataError::Http(status) => FailureClass::from_status(*status),
            // -32005: node is behind / rate limited on most Solana RPC providers
            ChainDataError::Rpc { code, .. } if *code == -32005 => FailureClass::Retryable,
            ChainDataError::Rpc { .. } | ChainDataError::ParseError(_) => FailureClass::Fatal,
        }
    }
}

/// Optional on-chain enrichment
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainDataPort: Send + Sync {
    /// Age, supply and mint authority status for a token.
    /// Implementations fill what they can and leave the rest as `None`.
    async fn fetch_chain_info(&self, token_address: &str) -> Result<ChainInfo, ChainDataError>;
}
