//! Rate Policies
//!
//! Pages and platforms do not always accept a requested playback rate.
//! A policy decides what a rate write actually does.

use crate::MediaError;

/// How a media element reacts to rate writes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RatePolicy {
    /// Every finite positive rate is applied
    #[default]
    Accept,
    /// Writes throw
    Reject,
    /// Writes are silently ignored
    Freeze,
    /// Writes are clamped to a supported range
    Limit { min: f64, max: f64 },
}

impl RatePolicy {
    /// Resolve a write of `requested` against the current rate.
    ///
    /// `Ok(None)` means the write was swallowed.
    pub fn apply(self, current: f64, requested: f64) -> Result<Option<f64>, MediaError> {
        match self {
            RatePolicy::Accept => Ok(Some(requested)),
            RatePolicy::Reject => Err(MediaError::NotAllowed(format!(
                "playback rate change from {current} refused"
            ))),
            RatePolicy::Freeze => {
                tracing::trace!("rate write {} ignored", requested);
                Ok(None)
            }
            RatePolicy::Limit { min, max } => Ok(Some(requested.clamp(min, max))),
        }
    }
}
