//! Coordinator
//!
//! Wires the scanner, watcher, controllers and keybinds together for one
//! page. Owns the tracked-media table: every tracked element has exactly
//! one controller, and media the site policy currently ignores wait in a
//! deferral table until a readiness event says otherwise.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fos_dom::{MediaEventKind, NodeId, WeakNodeMap};
use fos_page::{EventTarget, EventType, ListenerId, ListenerOptions, Page, TimerId};

use crate::blacklist::is_blacklisted;
use crate::constants::{speed, timing};
use crate::controller::{Controller, ControllerConfig};
use crate::keybinds::{ControllerSource, KeybindDispatcher};
use crate::messages::{ControlMessage, ControlResponse};
use crate::scanner::{find_all_media, is_target_media, is_valid_media};
use crate::settings::{KeyBinding, Settings, SettingsSource, WatchHandle};
use crate::shadow_access::ShadowAccess;
use crate::sites::SitePolicy;
use crate::watcher::{MediaSink, MediaWatcher};

/// Events that may make an ignored element worth controlling
const READINESS_EVENTS: [MediaEventKind; 4] = [
    MediaEventKind::LoadedMetadata,
    MediaEventKind::Resize,
    MediaEventKind::Play,
    MediaEventKind::CanPlay,
];

struct Tracked {
    controller: Controller,
    loadstart: ListenerId,
}

/// Pending activation of an ignored element
struct Deferral {
    listeners: Vec<ListenerId>,
    timeout: TimerId,
}

/// Resources that exist only while running
struct Running {
    policy: SitePolicy,
    watcher: MediaWatcher,
    keybinds: Option<KeybindDispatcher>,
    sweep: TimerId,
}

struct Shared {
    page: Page,
    source: Rc<dyn SettingsSource>,
    settings: RefCell<Settings>,
    access: ShadowAccess,
    running: RefCell<Option<Running>>,
    tracked: RefCell<WeakNodeMap<Tracked>>,
    deferred: RefCell<WeakNodeMap<Deferral>>,
    settings_watch: Cell<Option<WatchHandle>>,
    pagehide: Cell<Option<ListenerId>>,
    torn_down: Cell<bool>,
    this: Weak<Shared>,
}

/// Per-page orchestration of media discovery and controllers
pub struct Coordinator {
    shared: Rc<Shared>,
}

impl Coordinator {
    /// Load settings, subscribe to changes and page teardown, and start
    /// when enabled. An unreachable settings store means built-in defaults.
    pub fn new(page: &Page, source: Rc<dyn SettingsSource>) -> Coordinator {
        let settings = source.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings - using defaults: {}", e);
            Settings::default()
        });
        let access = ShadowAccess::resolve(&page.capabilities());
        let shared = Rc::new_cyclic(|this| Shared {
            page: page.clone(),
            source,
            settings: RefCell::new(settings),
            access,
            running: RefCell::new(None),
            tracked: RefCell::new(WeakNodeMap::new()),
            deferred: RefCell::new(WeakNodeMap::new()),
            settings_watch: Cell::new(None),
            pagehide: Cell::new(None),
            torn_down: Cell::new(false),
            this: this.clone(),
        });

        let weak = Rc::downgrade(&shared);
        let handle = shared.source.watch(Rc::new(move |settings: &Settings| {
            if let Some(shared) = weak.upgrade() {
                shared.on_settings_changed(settings);
            }
        }));
        shared.settings_watch.set(Some(handle));

        let weak = Rc::downgrade(&shared);
        let pagehide = page.add_event_listener(
            EventTarget::Window,
            EventType::PageHide,
            ListenerOptions::default(),
            move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.teardown();
                }
            },
        );
        shared.pagehide.set(Some(pagehide));

        tracing::debug!(
            "Coordinator for '{}' (top frame: {}, shadow access: {:?})",
            page.hostname(),
            page.is_top_frame(),
            access
        );
        if shared.settings.borrow().enabled {
            shared.start();
        }
        Coordinator { shared }
    }

    pub fn is_active(&self) -> bool {
        self.shared.running.borrow().is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.get()
    }

    /// Policy resolved at the last start
    pub fn policy(&self) -> Option<SitePolicy> {
        self.shared.running.borrow().as_ref().map(|r| r.policy)
    }

    pub fn settings(&self) -> Settings {
        self.shared.settings.borrow().clone()
    }

    pub fn tracked_count(&self) -> usize {
        self.shared.tracked.borrow().len()
    }

    pub fn deferred_count(&self) -> usize {
        self.shared.deferred.borrow().len()
    }

    pub fn is_deferred(&self, media: NodeId) -> bool {
        self.shared.deferred.borrow().contains(media)
    }

    pub fn controller_for(&self, media: NodeId) -> Option<Controller> {
        self.shared.tracked.borrow().get(media).map(|t| t.controller.clone())
    }

    /// Active controllers of connected media, in discovery order
    pub fn controllers(&self) -> Vec<Controller> {
        self.shared.live_controllers()
    }

    pub fn has_keybinds(&self) -> bool {
        self.shared
            .running
            .borrow()
            .as_ref()
            .is_some_and(|r| r.keybinds.as_ref().is_some_and(KeybindDispatcher::is_installed))
    }

    /// Run a control command against every live controller
    pub fn handle_message(&self, message: ControlMessage) -> ControlResponse {
        self.shared.handle_message(message)
    }

    /// Parse and run a JSON control command
    pub fn handle_raw(&self, json: &str) -> ControlResponse {
        match ControlMessage::parse(json) {
            Ok(message) => self.shared.handle_message(message),
            Err(e) => {
                tracing::warn!("Rejected control message: {}", e);
                ControlResponse::failure(e)
            }
        }
    }

    /// Extension context invalidated: tear everything down
    pub fn invalidate(&self) {
        self.shared.teardown();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl Shared {
    fn should_be_active(&self) -> bool {
        let settings = self.settings.borrow();
        settings.enabled && !is_blacklisted(&settings.blacklist, self.page.hostname())
    }

    fn start(&self) {
        if self.torn_down.get() || self.running.borrow().is_some() {
            return;
        }
        let hostname = self.page.hostname().to_string();
        let include_audio = {
            let settings = self.settings.borrow();
            if is_blacklisted(&settings.blacklist, &hostname) {
                tracing::debug!("'{}' is blacklisted - staying inactive", hostname);
                return;
            }
            settings.enable_audio
        };

        let policy = SitePolicy::resolve(&hostname);
        let sink: Weak<dyn MediaSink> = self.this.clone();
        let source: Weak<dyn ControllerSource> = self.this.clone();
        let watcher = MediaWatcher::new(&self.page, sink, include_audio, self.access);
        let keybinds = KeybindDispatcher::install(&self.page, source);

        let weak = self.this.clone();
        let sweep = self.page.set_interval(timing::STALE_SWEEP_MS, move || {
            if let Some(shared) = weak.upgrade() {
                shared.sweep_stale();
            }
        });
        self.running.replace(Some(Running { policy, watcher, keybinds, sweep }));

        let root = self.page.dom().root();
        let existing = {
            let dom = self.page.dom();
            find_all_media(&dom, root, include_audio, self.access)
        };
        tracing::debug!("Initial scan found {} media element(s)", existing.len());
        for media in existing {
            self.handle_found(media);
        }
        if let Some(running) = self.running.borrow().as_ref() {
            running.watcher.observe_tree(root);
        }
    }

    fn stop(&self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.page.clear_timer(running.sweep);
        running.watcher.stop();
        if let Some(keybinds) = &running.keybinds {
            keybinds.destroy();
        }
        drop(running);

        let tracked = self.tracked.borrow_mut().drain();
        for (_, entry) in &tracked {
            self.release_tracked(entry);
        }
        let deferred = self.deferred.borrow_mut().drain();
        for (_, deferral) in deferred {
            self.release_deferral(deferral);
        }
        tracing::debug!("Coordinator stopped ({} controller(s) destroyed)", tracked.len());
    }

    /// Idempotent full teardown
    fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        if let Some(listener) = self.pagehide.take() {
            self.page.remove_event_listener(listener);
        }
        self.stop();
        if let Some(handle) = self.settings_watch.take() {
            self.source.unwatch(handle);
        }
        tracing::debug!("Coordinator torn down");
    }

    fn on_settings_changed(&self, settings: &Settings) {
        if self.torn_down.get() {
            return;
        }
        let previous = self.settings.replace(settings.clone());
        let should_be_active = self.should_be_active();
        let active = self.running.borrow().is_some();
        match (should_be_active, active) {
            (true, false) => self.start(),
            (false, true) => self.stop(),
            (true, true) => {
                let config = ControllerConfig::from_settings(settings);
                for ctl in self.all_controllers() {
                    ctl.update_settings(config);
                }
                if previous.enable_audio != settings.enable_audio {
                    self.apply_audio_setting(settings.enable_audio);
                }
            }
            (false, false) => {}
        }
    }

    /// Pick up audio already on the page, or drop its controllers
    fn apply_audio_setting(&self, include_audio: bool) {
        if let Some(running) = self.running.borrow().as_ref() {
            running.watcher.set_include_audio(include_audio);
        }
        if include_audio {
            let found = {
                let dom = self.page.dom();
                find_all_media(&dom, dom.root(), true, self.access)
            };
            for media in found {
                self.handle_found(media);
            }
        } else {
            let audio: Vec<NodeId> = {
                let dom = self.page.dom();
                let mut known = self.tracked.borrow().keys();
                known.extend(self.deferred.borrow().keys());
                known
                    .into_iter()
                    .filter(|&media| dom.contains(media) && !is_target_media(&dom, media, false))
                    .collect()
            };
            for media in audio {
                self.handle_removed(media);
            }
        }
        tracing::debug!("Audio control {}", if include_audio { "enabled" } else { "disabled" });
    }

    fn policy(&self) -> Option<SitePolicy> {
        self.running.borrow().as_ref().map(|r| r.policy)
    }

    fn all_controllers(&self) -> Vec<Controller> {
        self.tracked.borrow().iter().map(|(_, t)| t.controller.clone()).collect()
    }

    fn handle_found(&self, media: NodeId) {
        let Some(policy) = self.policy() else {
            return;
        };
        if self.tracked.borrow().contains(media) {
            return;
        }
        let include_audio = self.settings.borrow().enable_audio;
        let (target, ignored, valid) = {
            let dom = self.page.dom();
            (
                is_target_media(&dom, media, include_audio),
                policy.should_ignore(&dom, media),
                is_valid_media(&dom, media),
            )
        };
        if !target {
            return;
        }
        if ignored {
            self.defer(media, policy);
            return;
        }
        if !valid {
            return;
        }
        self.cancel_deferral(media);

        let config = ControllerConfig::from_settings(&self.settings.borrow());
        let controller = match Controller::new(&self.page, media, policy, config) {
            Ok(controller) => controller,
            Err(e) => {
                tracing::warn!("No controller for {}: {}", media, e);
                return;
            }
        };

        let weak = self.this.clone();
        let loadstart = self.page.add_event_listener(
            media,
            EventType::Media(MediaEventKind::LoadStart),
            ListenerOptions::default(),
            move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.recheck_after_load(media);
                }
            },
        );
        tracing::debug!("Controller {} created for {}", controller.id(), media);
        self.tracked.borrow_mut().insert(media, Tracked { controller, loadstart });
    }

    fn handle_removed(&self, media: NodeId) {
        let entry = self.tracked.borrow_mut().remove(media);
        if let Some(entry) = entry {
            self.release_tracked(&entry);
            tracing::debug!("Controller {} removed", entry.controller.id());
        }
        self.cancel_deferral(media);
    }

    fn release_tracked(&self, entry: &Tracked) {
        entry.controller.destroy();
        self.page.remove_event_listener(entry.loadstart);
    }

    /// A new source started loading: drop the controller if the element is
    /// gone, rebuild it if it had destroyed itself
    fn recheck_after_load(&self, media: NodeId) {
        let valid = is_valid_media(&self.page.dom(), media);
        let controller = self.tracked.borrow().get(media).map(|t| t.controller.clone());
        match controller {
            Some(_) if !valid => self.handle_removed(media),
            Some(ctl) if !ctl.is_active() => {
                self.handle_removed(media);
                self.handle_found(media);
            }
            None if valid => self.handle_found(media),
            _ => {}
        }
    }

    fn defer(&self, media: NodeId, policy: SitePolicy) {
        if self.deferred.borrow().contains(media) {
            return;
        }
        let mut listeners = Vec::with_capacity(READINESS_EVENTS.len());
        for kind in READINESS_EVENTS {
            let weak = self.this.clone();
            listeners.push(self.page.add_event_listener(
                media,
                EventType::Media(kind),
                ListenerOptions::default(),
                move |_| {
                    if let Some(shared) = weak.upgrade() {
                        shared.retry_deferred(media, policy);
                    }
                },
            ));
        }
        let weak = self.this.clone();
        let timeout = self.page.set_timeout(timing::DEFERRED_TIMEOUT_MS, move || {
            if let Some(shared) = weak.upgrade() {
                tracing::debug!("Deferral of {} expired", media);
                shared.cancel_deferral(media);
            }
        });
        tracing::debug!("Media {} ignored by {} policy for now", media, policy.name());
        self.deferred.borrow_mut().insert(media, Deferral { listeners, timeout });
    }

    fn retry_deferred(&self, media: NodeId, policy: SitePolicy) {
        let still_ignored = policy.should_ignore(&self.page.dom(), media);
        if !still_ignored {
            self.cancel_deferral(media);
            self.handle_found(media);
        }
    }

    fn cancel_deferral(&self, media: NodeId) {
        let deferral = self.deferred.borrow_mut().remove(media);
        if let Some(deferral) = deferral {
            self.release_deferral(deferral);
        }
    }

    fn release_deferral(&self, deferral: Deferral) {
        self.page.clear_timer(deferral.timeout);
        for listener in deferral.listeners {
            self.page.remove_event_listener(listener);
        }
    }

    /// Drop controllers and deferrals of media that left the document
    fn sweep_stale(&self) {
        let (stale, released_tracked, released_deferred) = {
            let dom = self.page.dom();
            let stale: Vec<NodeId> = self
                .tracked
                .borrow()
                .keys()
                .into_iter()
                .chain(self.deferred.borrow().keys())
                .filter(|&media| dom.contains(media) && !dom.is_connected(media))
                .collect();
            (stale, self.tracked.borrow_mut().prune(&dom), self.deferred.borrow_mut().prune(&dom))
        };
        for (_, entry) in &released_tracked {
            self.release_tracked(entry);
        }
        for (_, deferral) in released_deferred {
            self.release_deferral(deferral);
        }
        for &media in &stale {
            self.handle_removed(media);
        }
        if !stale.is_empty() || !released_tracked.is_empty() {
            tracing::debug!("Swept {} stale media element(s)", stale.len() + released_tracked.len());
        }
    }

    fn live_controllers(&self) -> Vec<Controller> {
        self.all_controllers()
            .into_iter()
            .filter(|ctl| ctl.is_active() && ctl.is_connected())
            .collect()
    }

    fn handle_message(&self, message: ControlMessage) -> ControlResponse {
        let controllers = self.live_controllers();
        tracing::trace!("{} for {} controller(s)", message.kind(), controllers.len());
        let mut failures = Vec::new();
        for ctl in &controllers {
            let result = match message {
                ControlMessage::GetStatus => break,
                ControlMessage::SetSpeed(value) => ctl.set_speed(value),
                ControlMessage::AdjustSpeed(delta) => ctl.adjust_speed(delta),
                ControlMessage::ResetSpeed => ctl.reset_speed(),
                ControlMessage::ToggleDisplay => {
                    ctl.toggle_visibility();
                    Ok(())
                }
            };
            if let Err(e) = result {
                tracing::warn!("{} on controller {}: {}", message.kind(), ctl.id(), e);
                failures.push(e.to_string());
            }
        }
        match message {
            ControlMessage::GetStatus => ControlResponse::Status {
                has_videos: !controllers.is_empty(),
                current_speed: controllers.first().map_or(speed::DEFAULT, Controller::speed),
                video_count: controllers.len(),
            },
            _ if failures.is_empty() => ControlResponse::ok(),
            _ => ControlResponse::failure(failures.join("; ")),
        }
    }
}

impl MediaSink for Shared {
    fn is_known(&self, media: NodeId) -> bool {
        self.tracked.borrow().contains(media) || self.deferred.borrow().contains(media)
    }

    fn media_found(&self, media: NodeId) {
        self.handle_found(media);
    }

    fn media_removed(&self, media: NodeId) {
        self.handle_removed(media);
    }
}

impl ControllerSource for Shared {
    fn active_controllers(&self) -> Vec<Controller> {
        self.live_controllers()
    }

    fn key_bindings(&self) -> Option<Vec<KeyBinding>> {
        if self.running.borrow().is_none() {
            return None;
        }
        let settings = self.settings.borrow();
        settings.enabled.then(|| settings.key_bindings.clone())
    }
}
