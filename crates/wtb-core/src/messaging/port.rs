use std::time::Duration;

use async_trait::async_trait;

use crate::{domain::TelegramId, errors::Error, Result};

/// Outbound message transport port.
///
/// Telegram is the first implementation; the surface is the minimum the
/// linking protocol and the dispatcher need.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send `text` (lightweight Markdown) to the chat of `recipient`.
    async fn send_message(&self, recipient: TelegramId, text: &str) -> Result<()>;
}

/// One send, bounded by `timeout`. Elapsing maps to a transport error so
/// callers treat a hung transport like a failed one.
pub async fn send_bounded(
    transport: &dyn MessageTransport,
    recipient: TelegramId,
    text: &str,
    timeout: Duration,
) -> Result<()> {
    match tokio::time::timeout(timeout, transport.send_message(recipient, text)).await {
        Ok(res) => res,
        Err(_) => Err(Error::Transport(format!(
            "send to {} timed out after {timeout:?}",
            recipient.0
        ))),
    }
}
