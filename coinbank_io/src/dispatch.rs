//! Alert delivery channels.
use coinbank_traits::AlertDispatcher;

/// Writes alerts to the log; used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl AlertDispatcher for LogDispatcher {
    fn send(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::warn!(target: "coinbank::alert", %message, "alert");
        Ok(())
    }
}

#[cfg(feature = "telegram")]
pub use telegram::TelegramDispatcher;

#[cfg(feature = "telegram")]
mod telegram {
    use std::time::Duration;

    use coinbank_traits::AlertDispatcher;

    use crate::error::{IoError, Result};

    pub const API_BASE: &str = "https://api.telegram.org";

    /// Telegram Bot API `sendMessage` to a single chat.
    pub struct TelegramDispatcher {
        client: reqwest::blocking::Client,
        url: String,
        chat_id: i64,
    }

    // The URL embeds the bot token.
    impl core::fmt::Debug for TelegramDispatcher {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("TelegramDispatcher")
                .field("chat_id", &self.chat_id)
                .finish_non_exhaustive()
        }
    }

    impl TelegramDispatcher {
        pub fn new(bot_token: &str, chat_id: i64, timeout: Duration) -> Result<Self> {
            Self::with_base_url(API_BASE, bot_token, chat_id, timeout)
        }

        pub fn with_base_url(
            base: &str,
            bot_token: &str,
            chat_id: i64,
            timeout: Duration,
        ) -> Result<Self> {
            let token = bot_token.trim();
            if token.is_empty() {
                return Err(IoError::MissingToken);
            }
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()?;
            Ok(Self {
                client,
                url: format!("{}/bot{token}/sendMessage", base.trim_end_matches('/')),
                chat_id,
            })
        }
    }

    impl AlertDispatcher for TelegramDispatcher {
        fn send(&mut self, message: &str) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let resp = self
                .client
                .post(&self.url)
                .json(&serde_json::json!({ "chat_id": self.chat_id, "text": message }))
                .send()
                .map_err(IoError::from)?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().unwrap_or_default();
                return Err(Box::new(IoError::Status {
                    status: status.as_u16(),
                    body,
                }));
            }
            tracing::info!(chat_id = self.chat_id, "alert delivered to telegram");
            Ok(())
        }
    }
}
