use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::Error, Result};

/// Telegram user id (numeric).
///
/// For direct chats the Bot API accepts the user id as the chat id, so this
/// is the only Telegram identity we persist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelegramId(pub i64);

/// Lowercase-normalized EVM wallet address (`0x` + 40 hex digits).
///
/// Construction validates, so every holder can rely on the canonical form and
/// store lookups never miss on letter case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let Some(digits) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        else {
            return Err(Error::Validation(format!(
                "wallet address missing 0x prefix: {trimmed}"
            )));
        };
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Validation(format!(
                "wallet address is not 20 bytes of hex: {trimmed}"
            )));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> String {
        value.0
    }
}

/// The persistent wallet-to-Telegram link.
///
/// At most one per wallet and one per Telegram account; the store enforces
/// both sides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub wallet_address: WalletAddress,
    pub telegram_id: TelegramId,
    pub created_at: DateTime<Utc>,
}

/// Role an address plays in a rewards deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Receiver,
    Minter,
    Referral,
    Verifier,
}

impl Role {
    /// Label used in notification messages.
    pub fn label(self) -> &'static str {
        match self {
            Role::Receiver => "📥 Receiver",
            Role::Minter => "🔨 Minter",
            Role::Referral => "🤝 Referral",
            Role::Verifier => "✅ Verifier",
        }
    }
}
