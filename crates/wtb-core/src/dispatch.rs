//! Event fan-out to linked Telegram accounts.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    domain::{Role, TelegramId, WalletAddress},
    events::{
        ConnectedEvent, DailyClaimEvent, DisconnectedEvent, Event, RewardsDepositEvent,
    },
    formatting,
    messaging::port::{send_bounded, MessageTransport},
    store::port::BindingStore,
    Result,
};

/// Outcome for one intended recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    SkippedUnbound,
    Failed { detail: String },
}

/// One recipient's slot in a dispatch report, in resolution order.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub wallet: WalletAddress,
    pub telegram_id: Option<TelegramId>,
    pub roles: Vec<Role>,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.status == DeliveryStatus::Sent)
            .count()
    }
}

/// Resolves an event's recipients against the binding store and sends one
/// message per recipient.
pub struct Dispatcher {
    store: Arc<dyn BindingStore>,
    transport: Arc<dyn MessageTransport>,
    send_timeout: Duration,
    explorer_tx_base_url: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn BindingStore>,
        transport: Arc<dyn MessageTransport>,
        send_timeout: Duration,
        explorer_tx_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            send_timeout,
            explorer_tx_base_url: explorer_tx_base_url.into(),
        }
    }

    /// Fan an event out to every resolvable recipient.
    ///
    /// Per-recipient lookup and send failures are recorded in the report and
    /// never abort the remaining recipients. The call itself fails only when
    /// a `Disconnected` event cannot delete its binding.
    pub async fn dispatch(&self, event: &Event) -> Result<DispatchReport> {
        let report = match event {
            Event::Connected(e) => self.dispatch_connected(e).await?,
            Event::Disconnected(e) => self.dispatch_disconnected(e).await?,
            Event::RewardsDeposit(e) => self.dispatch_rewards_deposit(e).await?,
            Event::DailyClaim(e) => self.dispatch_daily_claim(e).await?,
        };
        info!(
            sent = report.sent(),
            recipients = report.deliveries.len(),
            "event dispatched"
        );
        Ok(report)
    }

    async fn dispatch_connected(&self, event: &ConnectedEvent) -> Result<DispatchReport> {
        // The event names its recipient; the store is not involved.
        let text = formatting::connected_message(&event.wallet_address);
        let status = self.send(event.telegram_id, &text).await;
        Ok(DispatchReport {
            deliveries: vec![Delivery {
                wallet: event.wallet_address.clone(),
                telegram_id: Some(event.telegram_id),
                roles: Vec::new(),
                status,
            }],
        })
    }

    async fn dispatch_disconnected(&self, event: &DisconnectedEvent) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        match self.store.lookup_by_wallet(&event.wallet_address).await {
            Ok(Some(binding)) => {
                // Notify first, while the binding still resolves.
                let text = formatting::disconnected_message(&event.wallet_address);
                let status = self.send(binding.telegram_id, &text).await;
                report.deliveries.push(Delivery {
                    wallet: event.wallet_address.clone(),
                    telegram_id: Some(binding.telegram_id),
                    roles: Vec::new(),
                    status,
                });
                // The deletion is this event's state change; unlike the
                // best-effort notice, its failure is the caller's problem.
                self.store.delete_by_wallet(&event.wallet_address).await?;
            }
            Ok(None) => {
                report.deliveries.push(Delivery {
                    wallet: event.wallet_address.clone(),
                    telegram_id: None,
                    roles: Vec::new(),
                    status: DeliveryStatus::SkippedUnbound,
                });
            }
            Err(e) => {
                report.deliveries.push(Delivery {
                    wallet: event.wallet_address.clone(),
                    telegram_id: None,
                    roles: Vec::new(),
                    status: DeliveryStatus::Failed {
                        detail: e.to_string(),
                    },
                });
            }
        }
        Ok(report)
    }

    async fn dispatch_rewards_deposit(
        &self,
        event: &RewardsDepositEvent,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        for (wallet, roles) in recipients_with_roles(event) {
            let delivery = match self.store.lookup_by_wallet(&wallet).await {
                Ok(Some(binding)) => {
                    let text = formatting::rewards_deposit_message(
                        event,
                        &roles,
                        &self.explorer_tx_base_url,
                    );
                    let status = self.send(binding.telegram_id, &text).await;
                    Delivery {
                        wallet,
                        telegram_id: Some(binding.telegram_id),
                        roles,
                        status,
                    }
                }
                Ok(None) => Delivery {
                    wallet,
                    telegram_id: None,
                    roles,
                    status: DeliveryStatus::SkippedUnbound,
                },
                Err(e) => Delivery {
                    wallet,
                    telegram_id: None,
                    roles,
                    status: DeliveryStatus::Failed {
                        detail: e.to_string(),
                    },
                },
            };
            report.deliveries.push(delivery);
        }
        Ok(report)
    }

    async fn dispatch_daily_claim(&self, event: &DailyClaimEvent) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        for claim in &event.artists {
            let delivery = match self.store.lookup_by_wallet(&claim.artist).await {
                Ok(Some(binding)) => {
                    let text = formatting::daily_claim_message(claim);
                    let status = self.send(binding.telegram_id, &text).await;
                    Delivery {
                        wallet: claim.artist.clone(),
                        telegram_id: Some(binding.telegram_id),
                        roles: Vec::new(),
                        status,
                    }
                }
                Ok(None) => Delivery {
                    wallet: claim.artist.clone(),
                    telegram_id: None,
                    roles: Vec::new(),
                    status: DeliveryStatus::SkippedUnbound,
                },
                Err(e) => Delivery {
                    wallet: claim.artist.clone(),
                    telegram_id: None,
                    roles: Vec::new(),
                    status: DeliveryStatus::Failed {
                        detail: e.to_string(),
                    },
                },
            };
            report.deliveries.push(delivery);
        }
        Ok(report)
    }

    async fn send(&self, recipient: TelegramId, text: &str) -> DeliveryStatus {
        match send_bounded(self.transport.as_ref(), recipient, text, self.send_timeout).await {
            Ok(()) => DeliveryStatus::Sent,
            Err(e) => {
                warn!(recipient = recipient.0, error = %e, "notification failed");
                DeliveryStatus::Failed {
                    detail: e.to_string(),
                }
            }
        }
    }
}

/// De-duplicated recipients in first-appearance order, each carrying every
/// role the address holds in the event.
fn recipients_with_roles(event: &RewardsDepositEvent) -> Vec<(WalletAddress, Vec<Role>)> {
    let slots = [
        (&event.receiver, Role::Receiver),
        (&event.minter, Role::Minter),
        (&event.referral, Role::Referral),
        (&event.verifier, Role::Verifier),
    ];

    let mut out: Vec<(WalletAddress, Vec<Role>)> = Vec::new();
    for (wallet, role) in slots {
        match out.iter_mut().find(|(w, _)| w == wallet) {
            Some((_, roles)) => roles.push(role),
            None => out.push((wallet.clone(), vec![role])),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::{
        errors::Error,
        events::ArtistClaim,
        store::memory::MemoryBindingStore,
    };

    struct RecordingTransport {
        sent: Mutex<Vec<(TelegramId, String)>>,
        fail_for: Option<TelegramId>,
        hang_for: Option<TelegramId>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: None,
                hang_for: None,
            }
        }

        fn failing_for(id: TelegramId) -> Self {
            Self {
                fail_for: Some(id),
                ..Self::new()
            }
        }

        fn hanging_for(id: TelegramId) -> Self {
            Self {
                hang_for: Some(id),
                ..Self::new()
            }
        }

        async fn sent(&self) -> Vec<(TelegramId, String)> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn send_message(&self, recipient: TelegramId, text: &str) -> Result<()> {
            if self.hang_for == Some(recipient) {
                std::future::pending::<()>().await;
            }
            if self.fail_for == Some(recipient) {
                return Err(Error::Transport("blocked by user".to_string()));
            }
            self.sent.lock().await.push((recipient, text.to_string()));
            Ok(())
        }
    }

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn rewards_event(
        receiver: WalletAddress,
        minter: WalletAddress,
        referral: WalletAddress,
        verifier: WalletAddress,
    ) -> Event {
        Event::RewardsDeposit(RewardsDepositEvent {
            receiver,
            minter,
            referral,
            verifier,
            transaction_hash: "0xfeed".to_string(),
        })
    }

    fn dispatcher(
        store: Arc<dyn BindingStore>,
        transport: Arc<dyn MessageTransport>,
    ) -> Dispatcher {
        Dispatcher::new(
            store,
            transport,
            Duration::from_secs(5),
            "https://etherscan.io/tx",
        )
    }

    #[tokio::test]
    async fn dual_role_address_gets_one_message_with_both_roles() {
        let store = Arc::new(MemoryBindingStore::new());
        store
            .replace_bindings_for(&wallet(1), TelegramId(100))
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(store, transport.clone());

        let event = rewards_event(wallet(1), wallet(1), wallet(2), wallet(3));
        let report = d.dispatch(&event).await.unwrap();

        // Three unique addresses, one bound.
        assert_eq!(report.deliveries.len(), 3);
        assert_eq!(report.sent(), 1);
        assert_eq!(
            report.deliveries[0].roles,
            vec![Role::Receiver, Role::Minter]
        );

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("You are the 📥 Receiver, 🔨 Minter"));
    }

    #[tokio::test]
    async fn unbound_recipients_are_skipped_not_errors() {
        let store = Arc::new(MemoryBindingStore::new());
        store
            .replace_bindings_for(&wallet(2), TelegramId(200))
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(store, transport.clone());

        let event = Event::DailyClaim(DailyClaimEvent {
            artists: vec![
                ArtistClaim {
                    artist: wallet(1),
                    quantity: 5,
                },
                ArtistClaim {
                    artist: wallet(2),
                    quantity: 7,
                },
            ],
        });
        let report = d.dispatch(&event).await.unwrap();

        assert_eq!(report.deliveries.len(), 2);
        assert_eq!(report.deliveries[0].status, DeliveryStatus::SkippedUnbound);
        assert_eq!(report.deliveries[1].status, DeliveryStatus::Sent);

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TelegramId(200));
        assert!(sent[0].1.contains("Quantity: 7"));
    }

    #[tokio::test]
    async fn one_failed_send_does_not_abort_siblings() {
        let store = Arc::new(MemoryBindingStore::new());
        store
            .replace_bindings_for(&wallet(1), TelegramId(100))
            .await
            .unwrap();
        store
            .replace_bindings_for(&wallet(2), TelegramId(200))
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::failing_for(TelegramId(100)));
        let d = dispatcher(store, transport.clone());

        let event = rewards_event(wallet(1), wallet(2), wallet(2), wallet(2));
        let report = d.dispatch(&event).await.unwrap();

        assert_eq!(report.deliveries.len(), 2);
        assert!(matches!(
            report.deliveries[0].status,
            DeliveryStatus::Failed { .. }
        ));
        assert_eq!(report.deliveries[1].status, DeliveryStatus::Sent);

        // wallet(2) holds every role but Receiver.
        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .1
            .contains("You are the 🔨 Minter, 🤝 Referral, ✅ Verifier"));
    }

    #[tokio::test]
    async fn hung_send_times_out_without_blocking_siblings() {
        let store = Arc::new(MemoryBindingStore::new());
        store
            .replace_bindings_for(&wallet(1), TelegramId(100))
            .await
            .unwrap();
        store
            .replace_bindings_for(&wallet(2), TelegramId(200))
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::hanging_for(TelegramId(100)));
        let d = Dispatcher::new(
            store,
            transport.clone(),
            Duration::from_millis(50),
            "https://etherscan.io/tx",
        );

        let event = rewards_event(wallet(1), wallet(2), wallet(2), wallet(2));
        let report = d.dispatch(&event).await.unwrap();

        assert_eq!(report.deliveries.len(), 2);
        match &report.deliveries[0].status {
            DeliveryStatus::Failed { detail } => assert!(detail.contains("timed out")),
            other => panic!("expected a timed-out failure, got {other:?}"),
        }
        assert_eq!(report.deliveries[1].status, DeliveryStatus::Sent);
        assert_eq!(transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn connected_event_messages_the_named_identity() {
        let store = Arc::new(MemoryBindingStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(store, transport.clone());

        let event = Event::Connected(ConnectedEvent {
            telegram_id: TelegramId(42),
            wallet_address: wallet(9),
        });
        let report = d.dispatch(&event).await.unwrap();

        assert_eq!(report.sent(), 1);
        let sent = transport.sent().await;
        assert_eq!(sent[0].0, TelegramId(42));
        assert!(sent[0].1.contains("Successfully Connected"));
    }

    #[tokio::test]
    async fn disconnected_event_notifies_then_unbinds() {
        let store = Arc::new(MemoryBindingStore::new());
        store
            .replace_bindings_for(&wallet(1), TelegramId(100))
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(store.clone(), transport.clone());

        let event = Event::Disconnected(DisconnectedEvent {
            wallet_address: wallet(1),
        });
        let report = d.dispatch(&event).await.unwrap();

        assert_eq!(report.sent(), 1);
        assert!(store.is_empty().await);
        assert!(transport.sent().await[0].1.contains("no longer linked"));
    }

    #[tokio::test]
    async fn disconnected_event_for_unbound_wallet_is_a_skip() {
        let store = Arc::new(MemoryBindingStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(store, transport.clone());

        let event = Event::Disconnected(DisconnectedEvent {
            wallet_address: wallet(1),
        });
        let report = d.dispatch(&event).await.unwrap();

        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.deliveries[0].status, DeliveryStatus::SkippedUnbound);
        assert!(transport.sent().await.is_empty());
    }

    #[test]
    fn recipients_keep_first_appearance_order() {
        let event = RewardsDepositEvent {
            receiver: wallet(3),
            minter: wallet(1),
            referral: wallet(3),
            verifier: wallet(2),
            transaction_hash: "0x0".to_string(),
        };
        let recipients = recipients_with_roles(&event);
        let order: Vec<_> = recipients.iter().map(|(w, _)| w.clone()).collect();
        assert_eq!(order, vec![wallet(3), wallet(1), wallet(2)]);
        assert_eq!(recipients[0].1, vec![Role::Receiver, Role::Referral]);
    }
}
