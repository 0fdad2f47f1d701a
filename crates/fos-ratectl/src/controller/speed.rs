//! Playback rate control and enforcement

use std::rc::Rc;

use fos_media::ReadyState;
use fos_page::Event;

use super::{Controller, ControllerState, format_speed, warn_on_err};
use crate::constants::{speed, timing};
use crate::{Error, Result};

pub const SPEED_BLOCKED: &str = "Speed control blocked";

/// Clamp to the supported range and round to two decimals
pub fn normalize_speed(requested: f64) -> f64 {
    (requested.clamp(speed::MIN, speed::MAX) * 100.0).round() / 100.0
}

fn same_rate(a: f64, b: f64) -> bool {
    (a - b).abs() <= speed::TOLERANCE
}

impl Controller {
    /// Request a playback rate and arm enforcement when it differs from 1.0.
    ///
    /// One animation frame later the element's actual rate is compared with
    /// the request; a rejected or limited change is reported on the OSD.
    pub fn set_speed(&self, requested: f64) -> Result<()> {
        if !requested.is_finite() {
            return Err(Error::InvalidSpeed(requested));
        }
        let mut inner = self.inner.borrow_mut();
        if inner.state != ControllerState::Active {
            return Err(Error::Destroyed);
        }
        let target = normalize_speed(requested);
        inner.target_speed = target;
        inner.enforcing = target != speed::DEFAULT;

        let page = inner.page.clone();
        let media = inner.media;
        let previous = page.dom().media(media).map_or(speed::DEFAULT, |m| m.playback_rate());
        if let Err(e) = page.dom_mut().set_playback_rate(media, target) {
            tracing::debug!("Rate write to {} rejected: {}", media, e);
        }

        if let Some(frame) = inner.verify_frame.take() {
            page.cancel_animation_frame(frame);
        }
        let weak = Rc::downgrade(&self.inner);
        inner.verify_frame = Some(page.request_animation_frame(move |_| {
            if let Some(inner) = weak.upgrade() {
                Controller { inner }.verify_speed(target, previous);
            }
        }));
        Ok(())
    }

    pub fn adjust_speed(&self, delta: f64) -> Result<()> {
        if !delta.is_finite() {
            return Err(Error::InvalidSpeed(delta));
        }
        self.set_speed(self.speed() + delta)
    }

    /// Back to 1.0 with enforcement disarmed
    pub fn reset_speed(&self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.enforcing = false;
            inner.target_speed = speed::DEFAULT;
        }
        self.set_speed(speed::DEFAULT)
    }

    /// Seek relative to the current position; skipped until metadata is loaded
    pub fn seek(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(Error::InvalidSeek(seconds));
        }
        let inner = self.inner.borrow();
        if inner.state != ControllerState::Active {
            return Err(Error::Destroyed);
        }
        let ready = inner.page.dom().media(inner.media).map(|m| m.ready_state);
        if ready.is_none_or(|state| state < ReadyState::HaveMetadata) {
            tracing::debug!("Seek on {} skipped: no metadata yet", inner.media);
            return Ok(());
        }
        if let Err(e) = inner.page.dom_mut().seek_by(inner.media, seconds) {
            tracing::error!("Seek failed: {}", e);
        }
        Ok(())
    }

    fn verify_speed(&self, requested: f64, previous: f64) {
        let message = {
            let mut inner = self.inner.borrow_mut();
            inner.verify_frame = None;
            if inner.state != ControllerState::Active {
                return;
            }
            let actual = inner
                .page
                .dom()
                .media(inner.media)
                .map_or(speed::DEFAULT, |m| m.playback_rate());
            if same_rate(actual, requested) {
                None
            } else if same_rate(actual, previous) {
                Some(SPEED_BLOCKED.to_string())
            } else {
                Some(format!("Speed limited to {}", format_speed(actual)))
            }
        };
        if let Some(message) = message {
            tracing::debug!("{}", message);
            self.show_osd(&message);
        }
    }

    pub(super) fn on_rate_change(&self, event: &mut Event) {
        let armed = {
            let inner = self.inner.borrow();
            inner.state == ControllerState::Active && inner.enforcing
        };
        if armed {
            // keep page scripts from reacting to our own writes
            event.stop_immediate_propagation();
        }
        self.update_speed_display();
        self.enforce();
    }

    fn update_speed_display(&self) {
        let inner = self.inner.borrow();
        if inner.state != ControllerState::Active {
            return;
        }
        let mut dom = inner.page.dom_mut();
        let rate = dom.media(inner.media).map_or(speed::DEFAULT, |m| m.playback_rate());
        warn_on_err("Updating speed readout", inner.overlay.set_speed_text(&mut dom, rate));
    }

    /// Re-apply the target after an outside rate change. Writes are spaced
    /// at least the enforcement debounce apart; a change inside the window
    /// schedules one trailing re-check instead.
    fn enforce(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state != ControllerState::Active || !inner.enforcing {
            return;
        }
        let page = inner.page.clone();
        let media = inner.media;
        let target = inner.target_speed;
        let rate = page.dom().media(media).map_or(speed::DEFAULT, |m| m.playback_rate());
        if same_rate(rate, target) {
            return;
        }

        let now = page.now();
        if let Some(last) = inner.last_enforcement {
            let elapsed = now - last;
            if elapsed < timing::ENFORCEMENT_DEBOUNCE_MS {
                if let Some(timer) = inner.recheck_timer.take() {
                    page.clear_timer(timer);
                }
                let weak = Rc::downgrade(&self.inner);
                inner.recheck_timer = Some(page.set_timeout(timing::ENFORCEMENT_DEBOUNCE_MS - elapsed, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.borrow_mut().recheck_timer = None;
                        Controller { inner }.enforce();
                    }
                }));
                return;
            }
        }

        inner.last_enforcement = Some(now);
        if let Err(e) = page.dom_mut().set_playback_rate(media, target) {
            // may be a transient platform restriction; stay armed
            tracing::debug!("Speed enforcement on {} failed: {}", media, e);
        }
    }
}
