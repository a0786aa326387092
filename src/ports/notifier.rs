use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::{Classify, FailureClass};
use crate::domain::CandidateKey;

/// Rendered alert ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    /// Candidate the alert is about
    pub key: CandidateKey,
    /// Main message (HTML)
    pub text: String,
    /// Follow-up message with the trade breakdown (HTML)
    pub details: Option<String>,
    /// Image to attach, by reference
    pub image_url: Option<String>,
}

/// Notification delivery error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Rate limited by notifier")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Notifier returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Message rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) if status.as_u16() == 429 => NotifyError::RateLimited,
            Some(status) => NotifyError::Http {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => NotifyError::Network(error.to_string()),
        }
    }
}

impl Classify for NotifyError {
    fn classify(&self) -> FailureClass {
        match self {
            NotifyError::RateLimited | NotifyError::Network(_) => FailureClass::Retryable,
            NotifyError::Http { status, .. } => FailureClass::from_status(*status),
            NotifyError::Rejected(_) => FailureClass::Fatal,
        }
    }
}

/// Alert delivery port
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Deliver an alert. `Ok` means the alert reached its destination.
    async fn notify(&self, alert: &AlertPayload) -> Result<(), NotifyError>;
}
