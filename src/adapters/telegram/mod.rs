//! Telegram Adapter
//!
//! Implementation of the NotifierPort for the Telegram Bot API, plus a
//! logging notifier for dry runs.

mod notifier;

pub use notifier::{LogNotifier, TelegramConfig, TelegramNotifier, MAX_CAPTION_CHARS};
