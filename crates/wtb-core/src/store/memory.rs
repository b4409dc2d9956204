//! In-memory binding store, mirroring the SQLite adapter's conflict
//! semantics. Used by tests and by deployments that can live without
//! persistence.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    domain::{Binding, TelegramId, WalletAddress},
    errors::Error,
    store::port::BindingStore,
    Result,
};

#[derive(Default)]
pub struct MemoryBindingStore {
    rows: Mutex<Vec<Binding>>,
}

impl MemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn upsert(&self, wallet: &WalletAddress, telegram_id: TelegramId) -> Result<()> {
        let mut rows = self.rows.lock().await;
        if rows
            .iter()
            .any(|b| b.telegram_id == telegram_id && b.wallet_address != *wallet)
        {
            return Err(Error::Store(format!(
                "telegram id {} is already bound to another wallet",
                telegram_id.0
            )));
        }
        if let Some(row) = rows.iter_mut().find(|b| b.wallet_address == *wallet) {
            row.telegram_id = telegram_id;
            row.created_at = Utc::now();
            return Ok(());
        }
        rows.push(Binding {
            wallet_address: wallet.clone(),
            telegram_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn replace_bindings_for(
        &self,
        wallet: &WalletAddress,
        telegram_id: TelegramId,
    ) -> Result<()> {
        // Single critical section, same effect as the SQLite
        // `INSERT OR REPLACE`: rows conflicting on either column go away.
        let mut rows = self.rows.lock().await;
        rows.retain(|b| b.wallet_address != *wallet && b.telegram_id != telegram_id);
        rows.push(Binding {
            wallet_address: wallet.clone(),
            telegram_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn lookup_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Binding>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|b| b.wallet_address == *wallet).cloned())
    }

    async fn lookup_by_telegram_id(&self, telegram_id: TelegramId) -> Result<Option<Binding>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|b| b.telegram_id == telegram_id).cloned())
    }

    async fn delete_by_wallet(&self, wallet: &WalletAddress) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|b| b.wallet_address != *wallet);
        Ok(rows.len() < before)
    }

    async fn delete_by_telegram_id(&self, telegram_id: TelegramId) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|b| b.telegram_id != telegram_id);
        Ok(rows.len() < before)
    }
}
