//! Wallet-ownership verification (EIP-191 `personal_sign`).

use std::time::Duration;

use alloy_primitives::{Address, Signature};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    domain::{TelegramId, WalletAddress},
    errors::Error,
    Result,
};

/// True iff `signature` over `message` recovers to `address` under EIP-191
/// personal-sign framing.
///
/// Malformed input is an ordinary `false`: callers treat every failure as an
/// invalid proof, and this must never panic on attacker-controlled bytes.
pub fn verify_ownership(address: &WalletAddress, message: &str, signature: &str) -> bool {
    let Ok(expected) = address.as_str().parse::<Address>() else {
        return false;
    };
    let Ok(sig) = signature.trim().parse::<Signature>() else {
        return false;
    };
    match sig.recover_address_from_msg(message.as_bytes()) {
        Ok(recovered) => recovered == expected,
        Err(_) => false,
    }
}

/// The document a wallet signs to prove it wants a specific link.
///
/// The nonce/timestamp pair makes every signing request distinct, so a
/// captured signature cannot be replayed for a different attempt, and the
/// embedded ids pin the signature to one wallet/Telegram pair.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkIntent {
    pub action: String,
    pub telegram_id: i64,
    pub wallet_address: String,
    /// Milliseconds since the epoch, set by the client when signing.
    pub timestamp: i64,
    pub nonce: u64,
}

impl LinkIntent {
    pub const ACTION: &'static str = "telegram-connect";

    pub fn parse(message: &str) -> Result<Self> {
        let intent: LinkIntent = serde_json::from_str(message)
            .map_err(|e| Error::SignatureInvalid(format!("malformed link intent: {e}")))?;
        if intent.action != Self::ACTION {
            return Err(Error::SignatureInvalid(format!(
                "unexpected intent action: {}",
                intent.action
            )));
        }
        Ok(intent)
    }

    /// Whether the intent names exactly this wallet and Telegram account.
    pub fn matches(&self, wallet: &WalletAddress, telegram_id: TelegramId) -> bool {
        self.telegram_id == telegram_id.0
            && WalletAddress::parse(&self.wallet_address)
                .map(|w| &w == wallet)
                .unwrap_or(false)
    }

    /// Whether the signing timestamp is within `max_age` of `now`.
    pub fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis().saturating_sub(self.timestamp);
        if age_ms <= 0 {
            return true;
        }
        Duration::from_millis(age_ms as u64) <= max_age
    }
}
