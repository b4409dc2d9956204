//! Notification message templates (Telegram Markdown parse mode).

use crate::{
    domain::{Role, WalletAddress},
    events::{ArtistClaim, RewardsDepositEvent},
};

pub fn connected_message(wallet: &WalletAddress) -> String {
    format!(
        "✅ *Successfully Connected!*\n\
         \n\
         Your Telegram account is now linked to:\n\
         `{wallet}`\n\
         \n\
         You will receive notifications for:\n\
         📥 Receiver Events\n\
         🔨 Minter Events\n\
         🤝 Referral Events\n\
         ✅ Verifier Events"
    )
}

pub fn disconnected_message(wallet: &WalletAddress) -> String {
    format!(
        "👋 *Disconnected*\n\
         \n\
         Your Telegram account is no longer linked to:\n\
         `{wallet}`\n\
         \n\
         You will no longer receive event notifications."
    )
}

/// One rewards notification, annotated with every role the recipient holds.
pub fn rewards_deposit_message(
    event: &RewardsDepositEvent,
    roles: &[Role],
    explorer_tx_base_url: &str,
) -> String {
    let role_line = if roles.is_empty() {
        String::new()
    } else {
        let labels = roles
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join(", ");
        format!("\nYou are the {labels}\n")
    };

    format!(
        "🎉 *New RewardsDeposit Event* 🎉\n\
         {role_line}\n\
         *Event Details:*\n\
         - Receiver: `{receiver}`\n\
         - Minter: `{minter}`\n\
         - Referral: `{referral}`\n\
         - Verifier: `{verifier}`\n\
         \n\
         🔗 [View on Etherscan]({explorer_tx_base_url}/{tx})",
        receiver = event.receiver,
        minter = event.minter,
        referral = event.referral,
        verifier = event.verifier,
        tx = event.transaction_hash,
    )
}

pub fn daily_claim_message(claim: &ArtistClaim) -> String {
    format!(
        "🎨 *New DailyClaim Event* 🎨\n\
         \n\
         *Event Details:*\n\
         - Artist: `{artist}`\n\
         - Quantity: {quantity}",
        artist = claim.artist,
        quantity = claim.quantity,
    )
}
