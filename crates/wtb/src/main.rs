use std::sync::Arc;

use wtb_core::{
    config::Config, dispatch::Dispatcher, link::LinkService, messaging::port::MessageTransport,
    store::port::BindingStore, telegram_auth::TelegramAuthVerifier,
};
use wtb_http::AppState;
use wtb_store::SqliteBindingStore;
use wtb_telegram::TelegramNotifier;

#[tokio::main]
async fn main() -> Result<(), wtb_core::Error> {
    wtb_core::logging::init("wtb")?;

    let cfg = Config::load()?;

    let store: Arc<dyn BindingStore> = Arc::new(
        SqliteBindingStore::connect(&cfg.database_url, cfg.store_acquire_timeout).await?,
    );
    let transport: Arc<dyn MessageTransport> =
        Arc::new(TelegramNotifier::from_token(&cfg.telegram_bot_token));
    let auth = TelegramAuthVerifier::new(&cfg.telegram_bot_token)?;

    let state = Arc::new(AppState {
        link: LinkService::new(
            auth.clone(),
            store.clone(),
            transport.clone(),
            cfg.telegram_auth_max_age,
            cfg.link_proof_max_age,
            cfg.send_timeout,
        ),
        dispatcher: Dispatcher::new(
            store.clone(),
            transport,
            cfg.send_timeout,
            cfg.explorer_tx_base_url.clone(),
        ),
        auth,
        auth_max_age: cfg.telegram_auth_max_age,
        store,
    });

    wtb_http::serve(&cfg.http_bind_addr, state).await?;

    Ok(())
}
