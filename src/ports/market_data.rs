use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::{Classify, FailureClass};
use crate::domain::{TokenCandidate, TokenMetrics};

/// Market data error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Required data unavailable: {0}")]
    MissingData(String),
}

impl MarketDataError {
    /// Map an unsuccessful HTTP status to an error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => MarketDataError::RateLimited,
            408 => MarketDataError::Timeout,
            401 | 403 => MarketDataError::Unauthorized(message),
            404 => MarketDataError::NotFound(message),
            _ => MarketDataError::Http { status, message },
        }
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return MarketDataError::Timeout;
        }
        if let Some(status) = error.status() {
            return MarketDataError::from_status(status.as_u16(), error.to_string());
        }
        if error.is_decode() {
            return MarketDataError::ParseError(error.to_string());
        }
        MarketDataError::Network(error.to_string())
    }
}

impl Classify for MarketDataError {
    fn classify(&self) -> FailureClass {
        match self {
            MarketDataError::RateLimited
            | MarketDataError::Timeout
            | MarketDataError::Network(_) => FailureClass::Retryable,
            MarketDataError::Http { status, .. } => FailureClass::from_status(*status),
            MarketDataError::Unauthorized(_)
            | MarketDataError::NotFound(_)
            | MarketDataError::ParseError(_)
            | MarketDataError::MissingData(_) => FailureClass::Fatal,
        }
    }
}

/// Market data port trait
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Recently listed token/pool pairs, in provider order
    async fn list_candidates(&self) -> Result<Vec<TokenCandidate>, MarketDataError>;

    /// Aggregated metrics for one candidate
    async fn fetch_metrics(&self, candidate: &TokenCandidate) -> Result<TokenMetrics, MarketDataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MarketDataError::from_status(429, ""), MarketDataError::RateLimited);
        assert!(matches!(MarketDataError::from_status(401, "bad key"), MarketDataError::Unauthorized(_)));
        assert!(matches!(MarketDataError::from_status(404, "gone"), MarketDataError::NotFound(_)));
        assert!(matches!(MarketDataError::from_status(503, "busy"), MarketDataError::Http { status: 503, .. }));
    }

    #[test]
    fn test_classification() {
        assert!(MarketDataError::RateLimited.is_retryable());
        assert!(MarketDataError::Network("reset".into()).is_retryable());
        assert!(MarketDataError::from_status(500, "oops").is_retryable());
        assert!(!MarketDataError::from_status(400, "bad").is_retryable());
        assert!(!MarketDataError::Unauthorized("key".into()).is_retryable());
        assert!(!MarketDataError::ParseError("eof".into()).is_retryable());
    }
}
