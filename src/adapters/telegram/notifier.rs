//! Telegram Notifier
//!
//! Delivers alerts through the Telegram Bot API in HTML parse mode with link
//! previews disabled. An alert with an image goes out as `sendPhoto` with the
//! summary as caption when it fits, otherwise as a plain `sendMessage`. The
//! transaction breakdown follows as a second message.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::ports::{AlertPayload, NotifierPort, NotifyError};

/// Telegram's limit on photo captions
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Telegram client configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

/// Telegram Bot API notifier
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    config: TelegramConfig,
    http: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.post("sendMessage", message_request(&self.config.chat_id, text))
            .await
    }

    pub async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), NotifyError> {
        self.post("sendPhoto", photo_request(&self.config.chat_id, photo_url, caption))
            .await
    }

    async fn post(&self, method: &str, body: Value) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/{}", self.config.api_url, self.config.bot_token, method);
        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status().as_u16();
        let reply: BotResponse = response.json().await.map_err(|e| NotifyError::Http {
            status,
            message: format!("unreadable {} response: {}", method, e),
        })?;

        if reply.ok {
            return Ok(());
        }
        Err(bot_error(
            reply.error_code.unwrap_or(status),
            reply.description.unwrap_or_default(),
        ))
    }
}

fn bot_error(code: u16, description: String) -> NotifyError {
    match code {
        429 => NotifyError::RateLimited,
        400 | 401 | 403 | 404 => NotifyError::Rejected(format!("{} {}", code, description)),
        _ => NotifyError::Http {
            status: code,
            message: description,
        },
    }
}

fn message_request(chat_id: &str, text: &str) -> Value {
    json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
    })
}

fn photo_request(chat_id: &str, photo_url: &str, caption: &str) -> Value {
    json!({
        "chat_id": chat_id,
        "photo": photo_url,
        "caption": caption,
        "parse_mode": "HTML",
    })
}

fn fits_caption(text: &str) -> bool {
    text.chars().count() <= MAX_CAPTION_CHARS
}

#[async_trait]
impl NotifierPort for TelegramNotifier {
    async fn notify(&self, alert: &AlertPayload) -> Result<(), NotifyError> {
        match alert.image_url.as_deref() {
            Some(photo) if fits_caption(&alert.text) => {
                if let Err(e) = self.send_photo(photo, &alert.text).await {
                    // A bad image URL should not cost the alert
                    if !matches!(e, NotifyError::Rejected(_)) {
                        return Err(e);
                    }
                    tracing::warn!("sendPhoto rejected for {} ({}), sending text only", alert.key, e);
                    self.send_message(&alert.text).await?;
                }
            }
            _ => self.send_message(&alert.text).await?,
        }

        // The main alert is out; a failed follow-up must not trigger a resend
        if let Some(details) = &alert.details {
            if let Err(e) = self.send_message(details).await {
                tracing::warn!("Failed to send details for {}: {}", alert.key, e);
            }
        }
        Ok(())
    }
}

/// Notifier for dry runs: logs alerts instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotifierPort for LogNotifier {
    async fn notify(&self, alert: &AlertPayload) -> Result<(), NotifyError> {
        tracing::info!("DRY RUN alert for {}:\n{}", alert.key, alert.text);
        if let Some(details) = &alert.details {
            tracing::info!("DRY RUN details for {}:\n{}", alert.key, details);
        }
        Ok(())
    }
}
