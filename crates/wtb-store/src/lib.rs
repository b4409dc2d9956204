//! SQLite-backed implementation of the binding store port.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};

use wtb_core::{
    domain::{Binding, TelegramId, WalletAddress},
    store::port::BindingStore,
    Error, Result,
};

/// Uniqueness on both columns is the whole point of the schema: SQLite's
/// `INSERT OR REPLACE` then evicts every row the new pair conflicts with.
const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS wallet_telegram_bindings (
    wallet_address TEXT NOT NULL UNIQUE,
    telegram_id INTEGER NOT NULL UNIQUE,
    created_at TEXT NOT NULL
)";

pub struct SqliteBindingStore {
    pool: SqlitePool,
}

impl SqliteBindingStore {
    /// Open (creating if missing) the database at `database_url` and ensure
    /// the schema exists.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(map_sqlx)?
            .create_if_missing(true)
            .busy_timeout(acquire_timeout);
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(map_sqlx)?;
        sqlx::query(SCHEMA).execute(&pool).await.map_err(map_sqlx)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_sqlx(e: sqlx::Error) -> Error {
    Error::Store(format!("sqlite error: {e}"))
}

fn row_to_binding(row: sqlx::sqlite::SqliteRow) -> Result<Binding> {
    let wallet: String = row.try_get("wallet_address").map_err(map_sqlx)?;
    let telegram_id: i64 = row.try_get("telegram_id").map_err(map_sqlx)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map_sqlx)?;
    // A row that no longer parses is corruption, not a lookup miss.
    let wallet_address = WalletAddress::parse(&wallet)
        .map_err(|e| Error::Store(format!("corrupt wallet_address row: {e}")))?;
    Ok(Binding {
        wallet_address,
        telegram_id: TelegramId(telegram_id),
        created_at,
    })
}

#[async_trait]
impl BindingStore for SqliteBindingStore {
    async fn upsert(&self, wallet: &WalletAddress, telegram_id: TelegramId) -> Result<()> {
        // Conflicts on telegram_id are not caught by the clause and surface
        // as a unique violation, which is exactly the contract.
        sqlx::query(
            "INSERT INTO wallet_telegram_bindings (wallet_address, telegram_id, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(wallet_address) DO UPDATE SET
                 telegram_id = excluded.telegram_id,
                 created_at = excluded.created_at",
        )
        .bind(wallet.as_str())
        .bind(telegram_id.0)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn replace_bindings_for(
        &self,
        wallet: &WalletAddress,
        telegram_id: TelegramId,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO wallet_telegram_bindings
                 (wallet_address, telegram_id, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(wallet.as_str())
        .bind(telegram_id.0)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn lookup_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Binding>> {
        let row = sqlx::query(
            "SELECT wallet_address, telegram_id, created_at
             FROM wallet_telegram_bindings WHERE wallet_address = ?",
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(row_to_binding).transpose()
    }

    async fn lookup_by_telegram_id(&self, telegram_id: TelegramId) -> Result<Option<Binding>> {
        let row = sqlx::query(
            "SELECT wallet_address, telegram_id, created_at
             FROM wallet_telegram_bindings WHERE telegram_id = ?",
        )
        .bind(telegram_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(row_to_binding).transpose()
    }

    async fn delete_by_wallet(&self, wallet: &WalletAddress) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wallet_telegram_bindings WHERE wallet_address = ?")
            .bind(wallet.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_telegram_id(&self, telegram_id: TelegramId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wallet_telegram_bindings WHERE telegram_id = ?")
            .bind(telegram_id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}
