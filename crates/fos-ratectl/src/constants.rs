//! Tuning constants

/// Playback rate bounds
pub mod speed {
    pub const MIN: f64 = 0.07;
    pub const MAX: f64 = 16.0;
    pub const DEFAULT: f64 = 1.0;
    pub const STEP: f64 = 0.1;
    /// Two rates within this distance are considered equal
    pub const TOLERANCE: f64 = 0.01;
}

/// Seeking
pub mod seek {
    pub const DEFAULT_SECONDS: f64 = 10.0;
}

/// Overlay appearance and placement
pub mod controller {
    /// Custom element tag of the overlay wrapper
    pub const TAG: &str = "ratectl-controller";
    pub const ID_PREFIX: &str = "ratectl";
    pub const MIN_OPACITY: f64 = 0.1;
    pub const MAX_OPACITY: f64 = 1.0;
    pub const MIN_BUTTON_SIZE: f64 = 10.0;
    pub const MAX_BUTTON_SIZE: f64 = 24.0;
    pub const DEFAULT_OFFSET: (f64, f64) = (10.0, 10.0);
    /// Minimum distance between the overlay and the parent's edges
    pub const BOUNDARY_PADDING: f64 = 10.0;
    pub const Z_INDEX: u32 = 999_999;
}

/// Minimum rendered sizes below which media is ignored
pub mod media_size {
    pub const MIN: (f64, f64) = (100.0, 100.0);
    pub const STREAMING: (f64, f64) = (300.0, 170.0);
    pub const SOCIAL: (f64, f64) = (200.0, 150.0);
    pub const TWITTER: (f64, f64) = (150.0, 100.0);
    pub const TWITTER_MUTED_MIN_WIDTH: f64 = 300.0;
    pub const TWITTER_AD_MIN_WIDTH: f64 = 400.0;
    pub const AMAZON: (f64, f64) = (200.0, 100.0);
    pub const TIKTOK: (f64, f64) = (200.0, 300.0);
    pub const TIKTOK_LOOP_MIN_HEIGHT: f64 = 400.0;
    pub const REDDIT: (f64, f64) = (300.0, 200.0);
    pub const REDDIT_MUTED_MIN_WIDTH: f64 = 400.0;
}

/// Change observation
pub mod observer {
    /// Timer fallback delay for a flush
    pub const DEBOUNCE_MS: f64 = 50.0;
    /// Idle callback timeout for a flush
    pub const IDLE_TIMEOUT_MS: f64 = 100.0;
    pub const MAX_SHADOW_DEPTH: usize = 50;
}

/// Lifecycle timings
pub mod timing {
    /// Interval of the sweep for controllers of disconnected media
    pub const STALE_SWEEP_MS: f64 = 5_000.0;
    /// How long a deferred element waits for a readiness signal
    pub const DEFERRED_TIMEOUT_MS: f64 = 30_000.0;
    pub const OSD_DISPLAY_MS: f64 = 800.0;
    pub const POSITION_CHECK_MS: f64 = 2_000.0;
    pub const RESIZE_DEBOUNCE_MS: f64 = 50.0;
    pub const ENFORCEMENT_DEBOUNCE_MS: f64 = 500.0;
}
