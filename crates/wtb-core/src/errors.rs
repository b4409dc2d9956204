/// Core error type for the bridge.
///
/// Adapter crates should map their specific errors into this type so the
/// linking protocol and the dispatcher can handle failures consistently
/// (terminal verification failure vs. recorded per-recipient failure).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("telegram auth rejected: {0}")]
    InvalidTelegramAuth(String),

    #[error("telegram auth expired")]
    TelegramAuthExpired,

    #[error("ownership proof rejected: {0}")]
    SignatureInvalid(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code, serialized by the HTTP surface.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::InvalidTelegramAuth(_) => "invalid_telegram_auth",
            Error::TelegramAuthExpired => "telegram_auth_expired",
            Error::SignatureInvalid(_) => "signature_invalid",
            Error::Store(_) => "store_error",
            Error::Transport(_) => "transport_error",
            Error::Validation(_) => "validation_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
