//! Telegram adapter (teloxide).
//!
//! This crate implements the `wtb-core` MessageTransport over the Telegram
//! Bot API.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;

use wtb_core::{domain::TelegramId, errors::Error, messaging::port::MessageTransport, Result};

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    // Direct chats: the chat id equals the user id.
    fn tg_chat(recipient: TelegramId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(recipient.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    /// Honor one flood-control wait, then give up. Anything else fails
    /// immediately; the caller records the failure and never re-queues.
    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessageTransport for TelegramNotifier {
    async fn send_message(&self, recipient: TelegramId, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(recipient), text.to_string())
                .parse_mode(ParseMode::Markdown)
        })
        .await?;
        Ok(())
    }
}
