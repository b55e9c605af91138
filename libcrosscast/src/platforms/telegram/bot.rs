//! Bot API client (`bot` scheme)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, Recipient};
use teloxide::{ApiError, RequestError};

use super::{ChatLocator, SentMessage, TelegramClient};
use crate::error::PlatformError;

/// Posts through a bot that is an administrator of the target channel
pub struct BotClient {
    bot: Bot,
    channel: Recipient,
}

impl BotClient {
    pub fn new(base_url: &str, token: SecretString, channel: &str) -> Result<Self, String> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| format!("Invalid Telegram API URL '{}': {}", base_url, e))?;

        Ok(Self {
            bot: Bot::new(token.expose_secret()).set_api_url(url),
            channel: recipient(channel),
        })
    }
}

#[async_trait]
impl TelegramClient for BotClient {
    async fn send_message(&self, text: &str) -> Result<SentMessage, PlatformError> {
        tracing::debug!("sendMessage to {:?} ({} characters)", self.channel, text.chars().count());

        let message = self
            .bot
            .send_message(self.channel.clone(), text)
            .await
            .map_err(|e| map_request_error(e, "sendMessage"))?;

        Ok(SentMessage {
            id: i64::from(message.id.0),
            chat_id: message.chat.id.0,
            date: message.date.timestamp(),
        })
    }

    async fn delete_message(&self, id: i64, locator: Option<&str>) -> Result<(), PlatformError> {
        let chat = locator.map(recipient).unwrap_or_else(|| self.channel.clone());
        let id = i32::try_from(id).map_err(|_| {
            PlatformError::Validation(format!("Telegram message id {} is out of range", id))
        })?;

        tracing::debug!("deleteMessage {} in {:?}", id, chat);

        self.bot
            .delete_message(chat, MessageId(id))
            .await
            .map_err(|e| map_request_error(e, "deleteMessage"))?;

        Ok(())
    }
}

/// Bot API recipient for a chat locator
pub fn recipient(locator: &str) -> Recipient {
    match ChatLocator::parse(locator) {
        ChatLocator::Id(id) => Recipient::Id(ChatId(id)),
        ChatLocator::Username(name) => Recipient::ChannelUsername(format!("@{}", name)),
    }
}

/// Map teloxide request failures to PlatformError
///
/// teloxide reports a rejected bot token as `ApiError::NotFound`, since the
/// Bot API answers 404 for any method under an unknown token.
pub fn map_request_error(error: RequestError, method: &str) -> PlatformError {
    let detail = error.to_string();
    match error {
        RequestError::Api(ApiError::NotFound) => PlatformError::Authentication(format!(
            "Telegram rejected the bot token ({}): {}. Check TELEGRAM_BOT_TOKEN.",
            method, detail
        )),
        RequestError::Api(ApiError::ChatNotFound) => PlatformError::EntityResolution(format!(
            "Telegram chat not found ({}): {}",
            method, detail
        )),
        RequestError::RetryAfter(_) => {
            PlatformError::RateLimit(format!("Telegram rate limit ({}): {}", method, detail))
        }
        RequestError::Network(_) => {
            PlatformError::Network(format!("Telegram request failed ({}): {}", method, detail))
        }
        _ => PlatformError::Posting(format!("Telegram error ({}): {}", method, detail)),
    }
}
