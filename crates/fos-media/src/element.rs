//! Media Elements
//!
//! Playback state shared by HTMLVideoElement and HTMLAudioElement.

use crate::{MediaError, RatePolicy};

/// Ready state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Which media element this state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Map a lowercase tag name to a media kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

/// Base media element (shared between video/audio)
#[derive(Debug, Clone)]
pub struct HTMLMediaElement {
    pub kind: MediaKind,
    pub src: String,

    // State
    pub ready_state: ReadyState,

    // Playback
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub loop_: bool,
    pub muted: bool,

    // Playback rate
    playback_rate: f64,
    pub default_playback_rate: f64,
    pub rate_policy: RatePolicy,
}

impl HTMLMediaElement {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            src: String::new(),
            ready_state: ReadyState::HaveNothing,
            current_time: 0.0,
            duration: f64::NAN,
            paused: true,
            loop_: false,
            muted: false,
            playback_rate: 1.0,
            default_playback_rate: 1.0,
            rate_policy: RatePolicy::Accept,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /// Current playback rate
    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Request a new playback rate.
    ///
    /// Returns whether the effective rate changed. The installed
    /// [`RatePolicy`] decides what actually lands.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<bool, MediaError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(MediaError::NotSupported(format!("playback rate {rate}")));
        }
        let applied = match self.rate_policy.apply(self.playback_rate, rate)? {
            Some(applied) => applied,
            None => return Ok(false),
        };
        let changed = applied != self.playback_rate;
        self.playback_rate = applied;
        Ok(changed)
    }

    /// Play media
    pub fn play(&mut self) -> bool {
        let was_paused = self.paused;
        self.paused = false;
        was_paused
    }

    /// Pause media
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Reset for a new source
    pub fn load(&mut self, src: &str) {
        self.src = src.to_string();
        self.ready_state = ReadyState::HaveNothing;
        self.current_time = 0.0;
        self.duration = f64::NAN;
        self.paused = true;
    }

    /// Seek to an absolute time
    pub fn seek(&mut self, time: f64) -> Result<(), MediaError> {
        if self.ready_state < ReadyState::HaveMetadata {
            return Err(MediaError::InvalidState("no metadata loaded".into()));
        }
        let end = if self.duration.is_finite() { self.duration } else { f64::MAX };
        self.current_time = time.clamp(0.0, end);
        Ok(())
    }

    /// Seek relative to the current position
    pub fn seek_by(&mut self, delta: f64) -> Result<(), MediaError> {
        self.seek(self.current_time + delta)
    }
}
