//! The linking protocol: verify both identities, bind, notify.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    domain::{TelegramId, WalletAddress},
    errors::Error,
    formatting,
    messaging::port::{send_bounded, MessageTransport},
    signature::{verify_ownership, LinkIntent},
    store::port::BindingStore,
    telegram_auth::{is_fresh_at, TelegramAuthVerifier, TelegramLoginPayload},
    Result,
};

/// A connect attempt as received from the outside.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub telegram_identity: TelegramLoginPayload,
    pub wallet_address: WalletAddress,
    pub proof_of_ownership: OwnershipProof,
}

/// The signed intent document plus its wallet signature, both verbatim from
/// the client: the message has to hash exactly as it was signed.
#[derive(Clone, Debug, Deserialize)]
pub struct OwnershipProof {
    pub message: String,
    pub signature: String,
}

/// Phases of one linking attempt, logged as the attempt advances. Failures
/// surface as the returned error together with the phase they happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkPhase {
    Idle,
    Verifying,
    Binding,
    Notifying,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    Linked,
    AlreadyLinked,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConnectReport {
    pub outcome: ConnectOutcome,
    pub notified: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DisconnectReport {
    pub removed: bool,
    pub notified: bool,
}

/// Orchestrates verifier, store and transport into the idempotent connect
/// flow, plus disconnect.
pub struct LinkService {
    auth: TelegramAuthVerifier,
    store: Arc<dyn BindingStore>,
    transport: Arc<dyn MessageTransport>,
    auth_max_age: Duration,
    proof_max_age: Duration,
    send_timeout: Duration,
}

impl LinkService {
    pub fn new(
        auth: TelegramAuthVerifier,
        store: Arc<dyn BindingStore>,
        transport: Arc<dyn MessageTransport>,
        auth_max_age: Duration,
        proof_max_age: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            auth,
            store,
            transport,
            auth_max_age,
            proof_max_age,
            send_timeout,
        }
    }

    /// Run the full connect protocol.
    ///
    /// Verification comes first; nothing is persisted or sent for a request
    /// that fails it. The confirmation message is best-effort: a transport
    /// failure is reported in the result but never rolls back the binding.
    pub async fn connect(&self, request: &LinkRequest) -> Result<ConnectReport> {
        let mut phase = LinkPhase::Idle;
        match self.run_connect(request, &mut phase).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(
                    wallet = %request.wallet_address,
                    phase = ?phase,
                    error = %e,
                    "link attempt failed"
                );
                Err(e)
            }
        }
    }

    async fn run_connect(
        &self,
        request: &LinkRequest,
        phase: &mut LinkPhase,
    ) -> Result<ConnectReport> {
        *phase = LinkPhase::Verifying;

        if !self.auth.verify(&request.telegram_identity) {
            return Err(Error::InvalidTelegramAuth(
                "login payload hash does not match".to_string(),
            ));
        }
        if !is_fresh_at(&request.telegram_identity, self.auth_max_age, Utc::now()) {
            return Err(Error::TelegramAuthExpired);
        }

        let telegram_id = request.telegram_identity.telegram_id();
        let intent = LinkIntent::parse(&request.proof_of_ownership.message)?;
        if !intent.matches(&request.wallet_address, telegram_id) {
            return Err(Error::SignatureInvalid(
                "intent does not name this wallet and telegram account".to_string(),
            ));
        }
        if !intent.is_fresh_at(self.proof_max_age, Utc::now()) {
            return Err(Error::SignatureInvalid(
                "intent timestamp too old".to_string(),
            ));
        }
        if !verify_ownership(
            &request.wallet_address,
            &request.proof_of_ownership.message,
            &request.proof_of_ownership.signature,
        ) {
            return Err(Error::SignatureInvalid(
                "signature does not recover to the wallet".to_string(),
            ));
        }

        *phase = LinkPhase::Binding;

        let existing = self.store.lookup_by_wallet(&request.wallet_address).await?;
        if existing.map(|b| b.telegram_id) == Some(telegram_id) {
            // Same pair again: nothing to write, no duplicate welcome.
            debug!(wallet = %request.wallet_address, "already linked");
            *phase = LinkPhase::Done;
            return Ok(ConnectReport {
                outcome: ConnectOutcome::AlreadyLinked,
                notified: false,
            });
        }

        self.store
            .replace_bindings_for(&request.wallet_address, telegram_id)
            .await?;

        *phase = LinkPhase::Notifying;

        let text = formatting::connected_message(&request.wallet_address);
        let notified = match send_bounded(
            self.transport.as_ref(),
            telegram_id,
            &text,
            self.send_timeout,
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(wallet = %request.wallet_address, error = %e, "welcome message failed");
                false
            }
        };

        *phase = LinkPhase::Done;
        debug!(wallet = %request.wallet_address, telegram_id = telegram_id.0, notified, "linked");

        Ok(ConnectReport {
            outcome: ConnectOutcome::Linked,
            notified,
        })
    }

    /// Remove the binding for `wallet`, if any.
    ///
    /// The farewell notice goes out while the binding still resolves; an
    /// unbound wallet is a success that never touches the transport.
    pub async fn disconnect(&self, wallet: &WalletAddress) -> Result<DisconnectReport> {
        let Some(binding) = self.store.lookup_by_wallet(wallet).await? else {
            debug!(wallet = %wallet, "disconnect of unbound wallet");
            return Ok(DisconnectReport {
                removed: false,
                notified: false,
            });
        };

        let text = formatting::disconnected_message(wallet);
        let notified = match send_bounded(
            self.transport.as_ref(),
            binding.telegram_id,
            &text,
            self.send_timeout,
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "disconnect notice failed");
                false
            }
        };

        let removed = self.store.delete_by_wallet(wallet).await?;
        debug!(wallet = %wallet, removed, notified, "disconnected");

        Ok(DisconnectReport { removed, notified })
    }
}
