//! Settings
//!
//! The configuration snapshot the overlay consumes, its defaults, and the
//! [`SettingsSource`] seam through which it is loaded and watched.
//! Stored values are validated per field: a bad field falls back to its
//! default without discarding the rest.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{controller, seek, speed};
use crate::{Error, Result};

/// Action a key binding triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Slower,
    Faster,
    Rewind,
    Advance,
    Reset,
    Display,
}

/// One key binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub action: KeyAction,
    /// Physical key code, e.g. `KeyS`
    pub key: String,
    /// Speed step or seek offset
    pub value: f64,
    /// Hide the key event from the page
    pub force: bool,
}

impl KeyBinding {
    pub fn new(action: KeyAction, key: &str, value: f64) -> Self {
        Self { action, key: key.to_string(), value, force: false }
    }
}

/// Configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub enable_audio: bool,
    pub start_hidden: bool,
    pub controller_opacity: f64,
    pub controller_button_size: f64,
    pub key_bindings: Vec<KeyBinding>,
    /// Newline-delimited domains and `/regex/` lines
    pub blacklist: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_audio: false,
            start_hidden: false,
            controller_opacity: 0.3,
            controller_button_size: 14.0,
            key_bindings: default_key_bindings(),
            blacklist: [
                "instagram.com",
                "x.com",
                "twitter.com",
                "imgur.com",
                "teams.microsoft.com",
                "meet.google.com",
            ]
            .join("\n"),
        }
    }
}

pub fn default_key_bindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new(KeyAction::Slower, "KeyS", speed::STEP),
        KeyBinding::new(KeyAction::Faster, "KeyD", speed::STEP),
        KeyBinding::new(KeyAction::Rewind, "KeyZ", seek::DEFAULT_SECONDS),
        KeyBinding::new(KeyAction::Advance, "KeyX", seek::DEFAULT_SECONDS),
        KeyBinding::new(KeyAction::Reset, "KeyR", speed::DEFAULT),
        KeyBinding::new(KeyAction::Display, "KeyV", 0.0),
    ]
}

impl Settings {
    /// Validate a stored value field by field
    pub fn from_value(value: &Value) -> Settings {
        let defaults = Settings::default();
        let Some(stored) = value.as_object() else {
            tracing::warn!("Stored settings are not an object - using defaults");
            return defaults;
        };
        let flag = |name: &str, fallback: bool| stored.get(name).and_then(Value::as_bool).unwrap_or(fallback);
        let number = |name: &str, fallback: f64| {
            stored
                .get(name)
                .and_then(Value::as_f64)
                .filter(|n| n.is_finite())
                .unwrap_or(fallback)
        };

        Settings {
            enabled: flag("enabled", defaults.enabled),
            enable_audio: flag("enableAudio", defaults.enable_audio),
            start_hidden: flag("startHidden", defaults.start_hidden),
            controller_opacity: number("controllerOpacity", defaults.controller_opacity),
            controller_button_size: number("controllerButtonSize", defaults.controller_button_size),
            key_bindings: validate_key_bindings(stored.get("keyBindings")),
            blacklist: stored
                .get("blacklist")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(defaults.blacklist),
        }
    }

    /// Parse and validate settings JSON
    pub fn from_json_str(json: &str) -> Result<Settings> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Settings::from_value(&value))
    }

    /// Overlay opacity within the supported range
    pub fn opacity(&self) -> f64 {
        self.controller_opacity.clamp(controller::MIN_OPACITY, controller::MAX_OPACITY)
    }

    /// Overlay button size within the supported range
    pub fn button_size(&self) -> f64 {
        self.controller_button_size
            .clamp(controller::MIN_BUTTON_SIZE, controller::MAX_BUTTON_SIZE)
    }

    pub fn binding_for(&self, action: KeyAction) -> Option<&KeyBinding> {
        self.key_bindings.iter().find(|b| b.action == action)
    }

    /// Step used by the overlay's slower/faster buttons
    pub fn speed_step(&self) -> f64 {
        self.binding_for(KeyAction::Faster).map_or(speed::STEP, |b| b.value)
    }

    /// Offset used by the overlay's rewind/advance buttons
    pub fn seek_step(&self) -> f64 {
        self.binding_for(KeyAction::Advance)
            .map_or(seek::DEFAULT_SECONDS, |b| b.value)
    }
}

fn validate_key_bindings(value: Option<&Value>) -> Vec<KeyBinding> {
    let Some(list) = value.and_then(Value::as_array) else {
        tracing::warn!("Invalid keyBindings - using defaults");
        return default_key_bindings();
    };
    let valid: Vec<KeyBinding> = list
        .iter()
        .filter_map(|b| serde_json::from_value::<KeyBinding>(b.clone()).ok())
        .filter(|b| b.value.is_finite())
        .collect();
    if valid.is_empty() {
        default_key_bindings()
    } else {
        valid
    }
}

/// Handle returned by [`SettingsSource::watch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchHandle(u64);

/// Settings change callback
pub type SettingsCallback = Rc<dyn Fn(&Settings)>;

/// Where settings come from
pub trait SettingsSource {
    /// Current snapshot
    fn load(&self) -> Result<Settings>;

    /// Register for change notifications
    fn watch(&self, callback: SettingsCallback) -> WatchHandle;

    fn unwatch(&self, handle: WatchHandle);
}

/// In-memory settings store
#[derive(Default)]
pub struct MemorySettings {
    stored: RefCell<Value>,
    unavailable: Cell<bool>,
    watchers: RefCell<Vec<(WatchHandle, SettingsCallback)>>,
    next_handle: Cell<u64>,
}

impl MemorySettings {
    pub fn new(settings: &Settings) -> Self {
        let store = Self::default();
        store.stored.replace(serde_json::to_value(settings).unwrap_or(Value::Null));
        store
    }

    /// Store a raw value, as if written by another surface
    pub fn from_value(value: Value) -> Self {
        let store = Self::default();
        store.stored.replace(value);
        store
    }

    /// Replace the stored snapshot and notify watchers
    pub fn set(&self, settings: &Settings) {
        match serde_json::to_value(settings) {
            Ok(value) => self.set_value(value),
            Err(e) => tracing::error!("Failed to store settings: {}", e),
        }
    }

    pub fn set_value(&self, value: Value) {
        self.stored.replace(value);
        let settings = Settings::from_value(&self.stored.borrow());
        let watchers: Vec<SettingsCallback> = self.watchers.borrow().iter().map(|(_, cb)| cb.clone()).collect();
        for watcher in watchers {
            watcher(&settings);
        }
    }

    /// Make `load` fail, like a store that cannot be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

impl SettingsSource for MemorySettings {
    fn load(&self) -> Result<Settings> {
        if self.unavailable.get() {
            return Err(Error::Settings("store unavailable".into()));
        }
        Ok(Settings::from_value(&self.stored.borrow()))
    }

    fn watch(&self, callback: SettingsCallback) -> WatchHandle {
        let handle = WatchHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.watchers.borrow_mut().push((handle, callback));
        handle
    }

    fn unwatch(&self, handle: WatchHandle) {
        self.watchers.borrow_mut().retain(|(h, _)| *h != handle);
    }
}
