//! fOS Media
//!
//! Media element state for the fOS engine.
//!
//! Features:
//! - HTMLVideoElement / HTMLAudioElement playback state
//! - Rate policies that model pages and platforms refusing rate changes

pub mod element;
pub mod rate;

pub use element::{HTMLMediaElement, MediaKind, ReadyState};
pub use rate::RatePolicy;

/// Media error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MediaError {
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),
}
