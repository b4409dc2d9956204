//! Telegram Login Widget verification.
//!
//! The widget signs its payload with HMAC-SHA256 keyed by SHA-256 of the bot
//! token. The data-check string is every field except `hash`, sorted
//! alphabetically and joined as `key=value` lines.

use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{domain::TelegramId, errors::Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Payload delivered by the Telegram Login Widget.
///
/// Unknown fields land in `extra` so they still participate in the data-check
/// string; dropping them would break the HMAC whenever Telegram adds a field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramLoginPayload {
    pub id: i64,
    /// Seconds since the epoch, set by Telegram at login time.
    pub auth_date: i64,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TelegramLoginPayload {
    pub fn telegram_id(&self) -> TelegramId {
        TelegramId(self.id)
    }

    /// All fields except `hash`, sorted by key, joined as `key=value` lines.
    fn data_check_string(&self) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), self.id.to_string());
        fields.insert("auth_date".to_string(), self.auth_date.to_string());
        if let Some(v) = &self.first_name {
            fields.insert("first_name".to_string(), v.clone());
        }
        if let Some(v) = &self.last_name {
            fields.insert("last_name".to_string(), v.clone());
        }
        if let Some(v) = &self.username {
            fields.insert("username".to_string(), v.clone());
        }
        if let Some(v) = &self.photo_url {
            fields.insert("photo_url".to_string(), v.clone());
        }
        for (k, v) in &self.extra {
            if k == "hash" {
                continue;
            }
            fields.insert(k.clone(), scalar_to_string(v));
        }

        fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn scalar_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Verifies login payloads for one bot.
#[derive(Clone)]
pub struct TelegramAuthVerifier {
    secret: [u8; 32],
}

impl TelegramAuthVerifier {
    /// The verifier refuses to exist without a token: a missing secret must
    /// fail closed, not verify everything.
    pub fn new(bot_token: &str) -> Result<Self> {
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "telegram bot token is required for auth verification".to_string(),
            ));
        }
        let secret: [u8; 32] = Sha256::digest(bot_token.as_bytes()).into();
        Ok(Self { secret })
    }

    /// Constant-time HMAC check of the widget payload.
    ///
    /// Malformed hex in `hash` is an ordinary mismatch, not an error.
    pub fn verify(&self, payload: &TelegramLoginPayload) -> bool {
        let Ok(claimed) = hex::decode(payload.hash.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload.data_check_string().as_bytes());
        mac.verify_slice(&claimed).is_ok()
    }
}

/// Whether `auth_date` is within `max_age` of `now`.
///
/// Future-dated payloads (clock skew) count as age zero.
pub fn is_fresh_at(payload: &TelegramLoginPayload, max_age: Duration, now: DateTime<Utc>) -> bool {
    let age_secs = now.timestamp().saturating_sub(payload.auth_date);
    if age_secs <= 0 {
        return true;
    }
    Duration::from_secs(age_secs as u64) <= max_age
}

pub fn is_fresh(payload: &TelegramLoginPayload, max_age: Duration) -> bool {
    is_fresh_at(payload, max_age, Utc::now())
}
