use async_trait::async_trait;

use crate::{
    domain::{Binding, TelegramId, WalletAddress},
    Result,
};

/// Persistence port for wallet-to-Telegram bindings.
///
/// Implementations must keep both columns unique: at most one binding per
/// wallet and one per Telegram account. Writes resolve conflicts inside the
/// store, never by read-then-write in the caller.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Insert the pair, or refresh the row when the wallet is already bound.
    /// Fails when the Telegram id belongs to a different wallet.
    async fn upsert(&self, wallet: &WalletAddress, telegram_id: TelegramId) -> Result<()>;

    /// Bind the pair, atomically displacing any binding that shares either
    /// side. One statement: concurrent callers can never observe two bindings
    /// for the same wallet or the same Telegram account.
    async fn replace_bindings_for(
        &self,
        wallet: &WalletAddress,
        telegram_id: TelegramId,
    ) -> Result<()>;

    async fn lookup_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Binding>>;
    async fn lookup_by_telegram_id(&self, telegram_id: TelegramId) -> Result<Option<Binding>>;

    /// Returns whether a binding was actually removed. Deleting a missing
    /// binding is not an error.
    async fn delete_by_wallet(&self, wallet: &WalletAddress) -> Result<bool>;
    async fn delete_by_telegram_id(&self, telegram_id: TelegramId) -> Result<bool>;
}
