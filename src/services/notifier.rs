use async_trait::async_trait;
use teloxide::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("delivery to chat {chat_id} failed: {reason}")]
pub struct DeliveryError {
    pub chat_id: i64,
    pub reason: String,
}

/// Sends a plain-text message to a delivery address.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;
}

pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError {
                chat_id,
                reason: e.to_string(),
            })
    }
}
