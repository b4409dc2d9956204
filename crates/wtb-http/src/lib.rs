//! HTTP adapter (axum).
//!
//! Exposes the linking protocol, Telegram login verification and event
//! ingestion as a small JSON API. Handlers translate between wire JSON and
//! `wtb-core` types; all decisions live in the core services.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use wtb_core::{
    dispatch::Dispatcher,
    domain::WalletAddress,
    errors::Error,
    events::Event,
    link::{LinkRequest, LinkService},
    store::port::BindingStore,
    telegram_auth::{is_fresh, TelegramAuthVerifier, TelegramLoginPayload},
    Result,
};

/// Body extractor that keeps axum's rejection instead of short-circuiting,
/// so `decode` can answer in the documented error shape.
type JsonBody = std::result::Result<Json<Value>, JsonRejection>;

pub struct AppState {
    pub link: LinkService,
    pub dispatcher: Dispatcher,
    pub auth: TelegramAuthVerifier,
    pub auth_max_age: Duration,
    pub store: Arc<dyn BindingStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/link", post(handle_link))
        .route("/link/:wallet", get(handle_link_status))
        .route("/unlink", post(handle_unlink))
        .route("/auth/telegram", post(handle_auth_telegram))
        .route("/events", post(handle_events))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

/// Bind and serve until the listener fails.
pub async fn serve(bind_addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "http api listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

async fn handle_link(
    State(state): State<Arc<AppState>>,
    body: JsonBody,
) -> (StatusCode, Json<Value>) {
    let request: LinkRequest = match decode(body, "invalid link request") {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.link.connect(&request).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({"status": report.outcome, "notified": report.notified})),
        ),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnlinkBody {
    wallet_address: WalletAddress,
}

async fn handle_unlink(
    State(state): State<Arc<AppState>>,
    body: JsonBody,
) -> (StatusCode, Json<Value>) {
    let body: UnlinkBody = match decode(body, "invalid unlink request") {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match state.link.disconnect(&body.wallet_address).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({"removed": report.removed, "notified": report.notified})),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_link_status(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
) -> (StatusCode, Json<Value>) {
    let wallet = match WalletAddress::parse(&wallet) {
        Ok(w) => w,
        Err(e) => return error_response(&e),
    };
    match state.store.lookup_by_wallet(&wallet).await {
        Ok(Some(binding)) => (
            StatusCode::OK,
            Json(json!({"linked": true, "telegramId": binding.telegram_id})),
        ),
        Ok(None) => (StatusCode::OK, Json(json!({"linked": false}))),
        Err(e) => error_response(&e),
    }
}

async fn handle_auth_telegram(
    State(state): State<Arc<AppState>>,
    body: JsonBody,
) -> (StatusCode, Json<Value>) {
    let payload: TelegramLoginPayload = match decode(body, "invalid login payload") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if !state.auth.verify(&payload) {
        return error_response(&Error::InvalidTelegramAuth(
            "login payload hash does not match".to_string(),
        ));
    }
    if !is_fresh(&payload, state.auth_max_age) {
        return error_response(&Error::TelegramAuthExpired);
    }
    // Echo the verified identity minus its check hash.
    let mut user = json!(payload);
    if let Some(fields) = user.as_object_mut() {
        fields.remove("hash");
    }
    (StatusCode::OK, Json(json!({"success": true, "user": user})))
}

async fn handle_events(
    State(state): State<Arc<AppState>>,
    body: JsonBody,
) -> (StatusCode, Json<Value>) {
    let event: Event = match decode(body, "unrecognized event") {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    match state.dispatcher.dispatch(&event).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({"deliveries": report.deliveries})),
        ),
        Err(e) => error_response(&e),
    }
}

/// Decode a request body into `T`.
///
/// Axum's own rejection for an unreadable body and a shape mismatch both
/// come back as the documented validation error.
fn decode<T: serde::de::DeserializeOwned>(
    body: JsonBody,
    label: &str,
) -> std::result::Result<T, (StatusCode, Json<Value>)> {
    let Json(value) = body.map_err(|e| bad_request(label, e))?;
    serde_json::from_value(value).map_err(|e| bad_request(label, e))
}

fn bad_request(label: &str, detail: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    error_response(&Error::Validation(format!("{label}: {detail}")))
}

/// Rejected requests are the caller's fault; everything else is ours.
fn error_status(e: &Error) -> StatusCode {
    match e {
        Error::InvalidTelegramAuth(_)
        | Error::TelegramAuthExpired
        | Error::SignatureInvalid(_)
        | Error::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &Error) -> (StatusCode, Json<Value>) {
    (
        error_status(e),
        Json(json!({"error": {"code": e.reason_code(), "message": e.to_string()}})),
    )
}
