//! DOM Events
//!
//! Event objects and listener options for capture/bubble dispatch.

use fos_dom::{MediaEventKind, NodeId};

/// Where an event is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Node(NodeId),
}

impl From<NodeId> for EventTarget {
    fn from(id: NodeId) -> Self {
        EventTarget::Node(id)
    }
}

/// Event types the runtime dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    KeyUp,
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    MouseDown,
    MouseMove,
    MouseUp,
    Click,
    Blur,
    PageHide,
    Media(MediaEventKind),
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::KeyDown => "keydown",
            EventType::KeyUp => "keyup",
            EventType::PointerDown => "pointerdown",
            EventType::PointerMove => "pointermove",
            EventType::PointerUp => "pointerup",
            EventType::PointerCancel => "pointercancel",
            EventType::MouseDown => "mousedown",
            EventType::MouseMove => "mousemove",
            EventType::MouseUp => "mouseup",
            EventType::Click => "click",
            EventType::Blur => "blur",
            EventType::PageHide => "pagehide",
            EventType::Media(kind) => kind.as_str(),
        }
    }

    /// Default `bubbles` flag
    pub fn bubbles(self) -> bool {
        !matches!(self, EventType::Blur | EventType::PageHide | EventType::Media(_))
    }
}

/// Keyboard modifier state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

/// Keyboard event data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardData {
    /// Physical key code (`KeyS`, `Digit1`, ...)
    pub code: String,
    pub modifiers: Modifiers,
}

/// Pointer/mouse event data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerData {
    pub client_x: f64,
    pub client_y: f64,
    pub button: i16,
}

/// Listener registration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self { capture: true, once: false }
    }

    pub fn once() -> Self {
        Self { capture: false, once: true }
    }
}

/// DOM Event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub bubbles: bool,
    pub cancelable: bool,
    pub key: Option<KeyboardData>,
    pub pointer: Option<PointerData>,
    target: Option<EventTarget>,
    current_target: Option<EventTarget>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            bubbles: event_type.bubbles(),
            cancelable: !matches!(event_type, EventType::Media(_) | EventType::PageHide),
            key: None,
            pointer: None,
            target: None,
            current_target: None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// `keydown` with the given physical key code
    pub fn key_down(code: &str) -> Self {
        let mut event = Self::new(EventType::KeyDown);
        event.key = Some(KeyboardData { code: code.to_string(), modifiers: Modifiers::default() });
        event
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        if let Some(key) = self.key.as_mut() {
            key.modifiers = modifiers;
        }
        self
    }

    /// Pointer or mouse event at client coordinates
    pub fn pointer(event_type: EventType, client_x: f64, client_y: f64) -> Self {
        let mut event = Self::new(event_type);
        event.pointer = Some(PointerData { client_x, client_y, button: 0 });
        event
    }

    pub fn media(kind: MediaEventKind) -> Self {
        Self::new(EventType::Media(kind))
    }

    /// Original target (not retargeted across shadow boundaries)
    pub fn target(&self) -> Option<EventTarget> {
        self.target
    }

    /// Target node, if the event was dispatched at a node
    pub fn target_node(&self) -> Option<NodeId> {
        match self.target {
            Some(EventTarget::Node(id)) => Some(id),
            _ => None,
        }
    }

    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub(crate) fn set_target(&mut self, target: EventTarget) {
        self.target = Some(target);
    }

    pub(crate) fn set_current_target(&mut self, target: Option<EventTarget>) {
        self.current_target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_events_do_not_bubble() {
        let event = Event::media(MediaEventKind::RateChange);
        assert!(!event.bubbles);
        assert_eq!(event.event_type.as_str(), "ratechange");
        assert!(Event::key_down("KeyS").bubbles);
    }

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut event = Event::media(MediaEventKind::Play);
        event.prevent_default();
        assert!(!event.default_prevented());

        let mut event = Event::key_down("KeyD");
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_stop_immediate_implies_stop() {
        let mut event = Event::new(EventType::Click);
        event.stop_immediate_propagation();
        assert!(event.propagation_stopped());
        assert!(event.immediate_propagation_stopped());
    }

    #[test]
    fn test_modifiers() {
        let event = Event::key_down("KeyS").with_modifiers(Modifiers { ctrl: true, ..Default::default() });
        assert!(event.key.unwrap().modifiers.any());
    }
}
