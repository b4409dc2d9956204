use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed runtime configuration, loaded from the environment (with `.env`
/// support for local runs).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_bind_addr: String,

    // Freshness windows and timeouts
    pub telegram_auth_max_age: Duration,
    pub link_proof_max_age: Duration,
    pub send_timeout: Duration,
    pub store_acquire_timeout: Duration,

    // Notification rendering
    pub explorer_tx_base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let database_url =
            env_str("DATABASE_URL").unwrap_or_else(|| "sqlite:wtb.db?mode=rwc".to_string());
        let http_bind_addr =
            env_str("HTTP_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8787".to_string());

        // Freshness windows default to one hour, matching the Telegram login
        // widget's own expiry expectations.
        let telegram_auth_max_age =
            Duration::from_millis(env_u64("TELEGRAM_AUTH_MAX_AGE_MS").unwrap_or(3_600_000));
        let link_proof_max_age =
            Duration::from_millis(env_u64("LINK_PROOF_MAX_AGE_MS").unwrap_or(3_600_000));

        let send_timeout = Duration::from_millis(env_u64("SEND_TIMEOUT_MS").unwrap_or(10_000));
        let store_acquire_timeout =
            Duration::from_millis(env_u64("STORE_ACQUIRE_TIMEOUT_MS").unwrap_or(5_000));

        let explorer_tx_base_url = env_str("EXPLORER_TX_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://etherscan.io/tx".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            telegram_bot_token,
            database_url,
            http_bind_addr,
            telegram_auth_max_age,
            link_proof_max_age,
            send_timeout,
            store_acquire_timeout,
            explorer_tx_base_url,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
