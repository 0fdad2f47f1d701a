//! Error types

/// Errors surfaced by the rate controller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid speed: {0}")]
    InvalidSpeed(f64),

    #[error("invalid seek offset: {0}")]
    InvalidSeek(f64),

    #[error("invalid payload for {message}: {reason}")]
    InvalidPayload { message: &'static str, reason: String },

    #[error("unknown message type: {0}")]
    UnknownMessage(String),

    #[error("controller has been destroyed")]
    Destroyed,

    #[error("settings unavailable: {0}")]
    Settings(String),

    #[error(transparent)]
    Dom(#[from] fos_dom::DomError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias
pub type Result<T> = std::result::Result<T, Error>;
