//! Inbound event payloads.
//!
//! Wire format is `{"type": ..., "data": ...}` with camelCase payload keys.
//! Deserialization is the validation boundary: unknown `type` values and
//! malformed payloads never reach the dispatcher.

use serde::{Deserialize, Serialize};

use crate::domain::{TelegramId, WalletAddress};

/// An event submitted for notification fan-out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    Connected(ConnectedEvent),
    Disconnected(DisconnectedEvent),
    RewardsDeposit(RewardsDepositEvent),
    DailyClaim(DailyClaimEvent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub telegram_id: TelegramId,
    pub wallet_address: WalletAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedEvent {
    pub wallet_address: WalletAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsDepositEvent {
    pub receiver: WalletAddress,
    pub minter: WalletAddress,
    pub referral: WalletAddress,
    pub verifier: WalletAddress,
    pub transaction_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyClaimEvent {
    pub artists: Vec<ArtistClaim>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistClaim {
    pub artist: WalletAddress,
    pub quantity: u64,
}
