//! Element Controller
//!
//! One overlay bound to one media element. The controller owns the
//! overlay markup, keeps it mounted where the site policy wants it,
//! lets the user drag it around inside the player, and enforces the
//! requested playback rate against page scripts that reset it.
//!
//! Every listener and timer holds a weak reference back to the
//! controller; [`Controller::destroy`] releases all of them.

mod drag;
mod overlay;
mod repair;
mod speed;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use fos_dom::{DomError, NodeId};
use fos_page::{Event, EventTarget, EventType, FrameId, ListenerId, ListenerOptions, Page, ResizeObserverId, TimerId};

use crate::constants::{controller, seek, speed as speed_limits, timing};
use crate::settings::Settings;
use crate::sites::SitePolicy;
use crate::{Error, Result};

pub use drag::Bounds;
pub use overlay::{ButtonAction, Overlay, collapsed_size, format_speed, shared_style_sheet};
pub use repair::Repair;
pub use speed::normalize_speed;

use drag::DragState;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Active,
    Destroyed,
}

/// Cosmetic and step settings a controller applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub opacity: f64,
    pub button_size: f64,
    /// Step of the slower/faster buttons
    pub speed_step: f64,
    /// Offset of the rewind/advance buttons
    pub seek_step: f64,
    pub start_hidden: bool,
}

impl ControllerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            opacity: settings.opacity(),
            button_size: settings.button_size(),
            speed_step: settings.speed_step(),
            seek_step: settings.seek_step(),
            start_hidden: settings.start_hidden,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            opacity: 0.3,
            button_size: 14.0,
            speed_step: speed_limits::STEP,
            seek_step: seek::DEFAULT_SECONDS,
            start_hidden: false,
        }
    }
}

pub(crate) struct ControllerInner {
    id: String,
    page: Page,
    media: NodeId,
    policy: SitePolicy,
    state: ControllerState,
    overlay: Overlay,
    config: ControllerConfig,
    manually_hidden: bool,

    position: (f64, f64),
    drag_position_initialized: bool,
    drag: Option<DragState>,

    target_speed: f64,
    enforcing: bool,
    last_enforcement: Option<f64>,
    recheck_timer: Option<TimerId>,
    verify_frame: Option<FrameId>,

    listeners: Vec<ListenerId>,
    position_check: Option<TimerId>,
    resize_observer: Option<ResizeObserverId>,
    resize_debounce: Option<TimerId>,
    osd_timer: Option<TimerId>,
}

/// Shared handle to one media element's controller
#[derive(Clone)]
pub struct Controller {
    inner: Rc<RefCell<ControllerInner>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Controller")
            .field("id", &inner.id)
            .field("media", &inner.media)
            .field("state", &inner.state)
            .field("target_speed", &inner.target_speed)
            .finish()
    }
}

fn warn_on_err<T>(what: &str, result: std::result::Result<T, DomError>) {
    if let Err(e) = result {
        tracing::warn!("{} failed: {}", what, e);
    }
}

impl Controller {
    /// Build the overlay for `media`, mount it and start listening
    pub fn new(page: &Page, media: NodeId, policy: SitePolicy, config: ControllerConfig) -> Result<Controller> {
        let rate = match page.dom().media(media) {
            Some(m) => m.playback_rate(),
            None => return Err(Error::Dom(DomError::NotMedia(media))),
        };
        let id = format!("{}-{}", controller::ID_PREFIX, NEXT_ID.fetch_add(1, Ordering::Relaxed));
        let position = controller::DEFAULT_OFFSET;
        let overlay = {
            let mut dom = page.dom_mut();
            let overlay = Overlay::build(&mut dom, &id, config.start_hidden, config.opacity, config.button_size)?;
            overlay.set_speed_text(&mut dom, rate)?;
            overlay.set_position(&mut dom, position.0, position.1)?;
            overlay
        };

        let ctl = Controller {
            inner: Rc::new(RefCell::new(ControllerInner {
                id,
                page: page.clone(),
                media,
                policy,
                state: ControllerState::Active,
                overlay,
                config,
                manually_hidden: config.start_hidden,
                position,
                drag_position_initialized: false,
                drag: None,
                target_speed: speed_limits::DEFAULT,
                enforcing: false,
                last_enforcement: None,
                recheck_timer: None,
                verify_frame: None,
                listeners: Vec::new(),
                position_check: None,
                resize_observer: None,
                resize_debounce: None,
                osd_timer: None,
            })),
        };

        if let Err(e) = ctl.mount() {
            ctl.destroy();
            return Err(e.into());
        }
        ctl.attach_listeners();

        let weak = ctl.downgrade();
        let interval = page.set_interval(timing::POSITION_CHECK_MS, move || {
            if let Some(ctl) = Controller::upgrade(&weak) {
                ctl.verify_and_repair();
            }
        });
        ctl.inner.borrow_mut().position_check = Some(interval);

        tracing::debug!("Controller {} attached to {}", ctl.id(), media);
        Ok(ctl)
    }

    fn downgrade(&self) -> Weak<RefCell<ControllerInner>> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<RefCell<ControllerInner>>) -> Option<Controller> {
        weak.upgrade().map(|inner| Controller { inner })
    }

    fn page(&self) -> Page {
        self.inner.borrow().page.clone()
    }

    /// Register a listener that calls back into this controller while it lives
    fn listen(
        &self,
        target: impl Into<EventTarget>,
        event_type: EventType,
        options: ListenerOptions,
        handler: impl Fn(&Controller, &mut Event) + 'static,
    ) -> ListenerId {
        let weak = self.downgrade();
        self.page().add_event_listener(target, event_type, options, move |event| {
            if let Some(ctl) = Controller::upgrade(&weak) {
                handler(&ctl, event);
            }
        })
    }

    fn attach_listeners(&self) {
        let (media, overlay, pointer_events) = {
            let inner = self.inner.borrow();
            (inner.media, inner.overlay.clone(), inner.page.capabilities().pointer_events)
        };
        let mut ids = vec![
            self.listen(
                media,
                EventType::Media(fos_dom::MediaEventKind::RateChange),
                ListenerOptions::capture(),
                |ctl, event| ctl.on_rate_change(event),
            ),
            self.listen(
                media,
                EventType::Media(fos_dom::MediaEventKind::Play),
                ListenerOptions::default(),
                |ctl, _| ctl.on_play(),
            ),
        ];
        let drag_start = if pointer_events { EventType::PointerDown } else { EventType::MouseDown };
        ids.push(self.listen(overlay.speed_display, drag_start, ListenerOptions::default(), |ctl, event| {
            ctl.on_drag_start(event)
        }));
        for &(action, button) in &overlay.buttons {
            ids.push(self.listen(button, EventType::Click, ListenerOptions::default(), move |ctl, event| {
                event.prevent_default();
                event.stop_propagation();
                ctl.on_button(action);
            }));
        }
        self.inner.borrow_mut().listeners = ids;
    }

    fn on_button(&self, action: ButtonAction) {
        let config = self.inner.borrow().config;
        let result = match action {
            ButtonAction::Rewind => self.seek(-config.seek_step),
            ButtonAction::Slower => self.adjust_speed(-config.speed_step),
            ButtonAction::Faster => self.adjust_speed(config.speed_step),
            ButtonAction::Advance => self.seek(config.seek_step),
            ButtonAction::Hide => {
                self.toggle_visibility();
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!("Overlay {} button: {}", action.as_str(), e);
        }
    }

    fn on_play(&self) {
        let inner = self.inner.borrow();
        if inner.state != ControllerState::Active || inner.manually_hidden {
            return;
        }
        let mut dom = inner.page.dom_mut();
        if dom.has_class(inner.overlay.panel, "hidden") {
            warn_on_err("Un-hiding overlay", inner.overlay.set_hidden(&mut dom, false));
        }
    }

    // ---- accessors ----

    pub fn id(&self) -> String {
        self.inner.borrow().id.clone()
    }

    pub fn media(&self) -> NodeId {
        self.inner.borrow().media
    }

    pub fn state(&self) -> ControllerState {
        self.inner.borrow().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == ControllerState::Active
    }

    /// Whether the bound element is still in the document
    pub fn is_connected(&self) -> bool {
        let inner = self.inner.borrow();
        inner.page.dom().is_connected(inner.media)
    }

    pub fn overlay(&self) -> Overlay {
        self.inner.borrow().overlay.clone()
    }

    pub fn config(&self) -> ControllerConfig {
        self.inner.borrow().config
    }

    /// Overlay offset from its mount parent
    pub fn position(&self) -> (f64, f64) {
        self.inner.borrow().position
    }

    pub fn is_manually_hidden(&self) -> bool {
        self.inner.borrow().manually_hidden
    }

    pub fn is_dragging(&self) -> bool {
        self.inner.borrow().drag.is_some()
    }

    /// Current playback rate of the element
    pub fn speed(&self) -> f64 {
        let inner = self.inner.borrow();
        inner
            .page
            .dom()
            .media(inner.media)
            .map_or(speed_limits::DEFAULT, |m| m.playback_rate())
    }

    pub fn target_speed(&self) -> f64 {
        self.inner.borrow().target_speed
    }

    pub fn is_enforcing(&self) -> bool {
        self.inner.borrow().enforcing
    }

    /// Text of the speed readout
    pub fn speed_text(&self) -> String {
        let inner = self.inner.borrow();
        inner.page.dom().text_content(inner.overlay.speed_display)
    }

    pub fn osd_text(&self) -> String {
        let inner = self.inner.borrow();
        inner.page.dom().text_content(inner.overlay.osd)
    }

    pub fn is_osd_visible(&self) -> bool {
        let inner = self.inner.borrow();
        inner.page.dom().has_class(inner.overlay.osd, "show")
    }

    // ---- operations ----

    /// Flip manual visibility
    pub fn toggle_visibility(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state != ControllerState::Active {
            return;
        }
        inner.manually_hidden = !inner.manually_hidden;
        let hidden = inner.manually_hidden;
        let mut dom = inner.page.dom_mut();
        warn_on_err("Toggling overlay", inner.overlay.set_hidden(&mut dom, hidden));
    }

    /// Apply new cosmetic settings and steps in place
    pub fn update_settings(&self, config: ControllerConfig) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ControllerState::Active {
                return;
            }
            inner.config = config;
            let mut dom = inner.page.dom_mut();
            warn_on_err(
                "Updating overlay appearance",
                inner.overlay.apply_appearance(&mut dom, config.opacity, config.button_size),
            );
        }
        self.clamp_position();
    }

    /// Show a transient message on the overlay
    pub fn show_osd(&self, message: &str) {
        let mut inner = self.inner.borrow_mut();
        if inner.state != ControllerState::Active {
            return;
        }
        let page = inner.page.clone();
        let osd = inner.overlay.osd;
        {
            let mut dom = page.dom_mut();
            warn_on_err("Writing OSD", dom.set_text_content(osd, message));
            warn_on_err("Showing OSD", dom.add_class(osd, "show"));
        }
        if let Some(timer) = inner.osd_timer.take() {
            page.clear_timer(timer);
        }
        let weak = self.downgrade();
        inner.osd_timer = Some(page.set_timeout(timing::OSD_DISPLAY_MS, move || {
            if let Some(ctl) = Controller::upgrade(&weak) {
                let mut inner = ctl.inner.borrow_mut();
                inner.osd_timer = None;
                warn_on_err("Fading OSD", inner.page.dom_mut().remove_class(osd, "show"));
            }
        }));
    }

    /// Release every listener, timer and observer and remove the overlay.
    /// Safe to call more than once.
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state == ControllerState::Destroyed {
            return;
        }
        inner.state = ControllerState::Destroyed;
        inner.enforcing = false;
        let page = inner.page.clone();

        let mut listeners = std::mem::take(&mut inner.listeners);
        if let Some(drag) = inner.drag.take() {
            listeners.extend(drag.listeners);
        }
        for id in listeners {
            page.remove_event_listener(id);
        }
        for timer in [
            inner.osd_timer.take(),
            inner.resize_debounce.take(),
            inner.position_check.take(),
            inner.recheck_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            page.clear_timer(timer);
        }
        if let Some(frame) = inner.verify_frame.take() {
            page.cancel_animation_frame(frame);
        }
        if let Some(observer) = inner.resize_observer.take() {
            page.disconnect_resize_observer(observer);
        }

        let wrapper = inner.overlay.wrapper;
        let mut dom = page.dom_mut();
        if dom.contains(wrapper) {
            warn_on_err("Removing overlay", dom.remove(wrapper).and_then(|_| dom.release(wrapper)));
        }
        tracing::debug!("Controller {} destroyed", inner.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::DOMRect;

    pub(super) fn page_with_video() -> (Page, NodeId, NodeId) {
        let page = Page::new("https://example.com/watch");
        let body = page.dom().body();
        let (container, video) = {
            let mut dom = page.dom_mut();
            let container = dom.create_element("div");
            dom.add_class(container, "player-container").unwrap();
            dom.append_child(body, container).unwrap();
            dom.set_layout_rect(container, DOMRect::from_xywh(0.0, 0.0, 640.0, 360.0)).unwrap();
            let video = dom.create_element("video");
            dom.append_child(container, video).unwrap();
            dom.set_layout_rect(video, DOMRect::from_xywh(0.0, 0.0, 640.0, 360.0)).unwrap();
            (container, video)
        };
        (page, container, video)
    }

    pub(super) fn controller(page: &Page, video: NodeId) -> Controller {
        Controller::new(page, video, SitePolicy::Generic, ControllerConfig::default()).unwrap()
    }

    #[test]
    fn test_mounts_into_policy_target() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        let wrapper = ctl.overlay().wrapper;
        let dom = page.dom();
        assert_eq!(dom.parent(wrapper), Some(container));
        assert_eq!(dom.children(container)[0], wrapper);
        assert_eq!(dom.style(container).and_then(|s| s.get("position")), Some("relative"));
        assert_eq!(dom.text_content(ctl.overlay().speed_display), "1.00x");
        assert!(ctl.id().starts_with("ratectl-"));
    }

    #[test]
    fn test_rejects_non_media() {
        let (page, container, _) = page_with_video();
        let err = Controller::new(&page, container, SitePolicy::Generic, ControllerConfig::default());
        assert!(matches!(err, Err(Error::Dom(DomError::NotMedia(_)))));
    }

    #[test]
    fn test_toggle_visibility() {
        let (page, _, video) = page_with_video();
        let ctl = controller(&page, video);
        ctl.toggle_visibility();
        assert!(ctl.is_manually_hidden());
        assert!(page.dom().has_class(ctl.overlay().panel, "hidden"));
        ctl.toggle_visibility();
        assert!(!page.dom().has_class(ctl.overlay().panel, "hidden"));
    }

    #[test]
    fn test_osd_fades() {
        let (page, _, video) = page_with_video();
        let ctl = controller(&page, video);
        ctl.show_osd("hello");
        assert!(ctl.is_osd_visible());
        assert_eq!(ctl.osd_text(), "hello");
        page.advance(timing::OSD_DISPLAY_MS - 1.0);
        ctl.show_osd("again");
        page.advance(timing::OSD_DISPLAY_MS - 1.0);
        assert!(ctl.is_osd_visible());
        page.advance(1.0);
        assert!(!ctl.is_osd_visible());
    }

    #[test]
    fn test_update_settings_in_place() {
        let (page, _, video) = page_with_video();
        let ctl = controller(&page, video);
        let wrapper = ctl.overlay().wrapper;
        let config = ControllerConfig { opacity: 0.8, button_size: 20.0, speed_step: 0.25, ..ControllerConfig::default() };
        ctl.update_settings(config);
        assert_eq!(ctl.overlay().wrapper, wrapper);
        let dom = page.dom();
        assert_eq!(dom.style(ctl.overlay().panel).and_then(|s| s.get("--ratectl-opacity")), Some("0.8"));
        assert_eq!(dom.offset_width(wrapper), collapsed_size(20.0).0);
        drop(dom);
        assert_eq!(ctl.config().speed_step, 0.25);
    }

    #[test]
    fn test_faster_button_uses_step() {
        let (page, _, video) = page_with_video();
        let ctl = controller(&page, video);
        let faster = ctl.overlay().button(ButtonAction::Faster).unwrap();
        page.dispatch_event(faster, Event::new(EventType::Click));
        page.flush();
        assert_eq!(ctl.speed(), 1.1);
        assert_eq!(ctl.speed_text(), "1.10x");
    }

    #[test]
    fn test_destroy_releases_everything() {
        let (page, _, video) = page_with_video();
        let listeners = page.listener_count();
        let timers = page.timer_count();
        let ctl = controller(&page, video);
        ctl.set_speed(2.0).unwrap();
        ctl.show_osd("x");
        assert!(page.listener_count() > listeners);
        assert_eq!(page.resize_observer_count(), 1);

        ctl.destroy();
        ctl.destroy();
        assert_eq!(ctl.state(), ControllerState::Destroyed);
        assert_eq!(page.listener_count(), listeners);
        assert_eq!(page.timer_count(), timers);
        assert_eq!(page.resize_observer_count(), 0);
        assert!(!page.dom().contains(ctl.overlay().wrapper));
        assert!(matches!(ctl.set_speed(1.5), Err(Error::Destroyed)));
    }
}
