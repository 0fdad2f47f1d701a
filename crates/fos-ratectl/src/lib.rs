//! fOS Rate Control
//!
//! Playback-rate overlay for media elements on a page: discovers `<video>`
//! (and optionally `<audio>`) elements through open and closed shadow
//! roots, attaches a draggable speed controller to each, applies per-site
//! placement and ignore rules, and drives it all from keyboard bindings,
//! overlay buttons and control messages.

pub mod blacklist;
pub mod constants;
pub mod controller;
pub mod coordinator;
mod error;
pub mod keybinds;
pub mod logging;
pub mod messages;
pub mod scanner;
pub mod settings;
pub mod shadow_access;
pub mod sites;
pub mod watcher;

pub use controller::{Controller, ControllerConfig, ControllerState};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use keybinds::KeybindDispatcher;
pub use messages::{ControlMessage, ControlResponse};
pub use settings::{KeyAction, KeyBinding, MemorySettings, Settings, SettingsSource};
pub use sites::SitePolicy;
pub use watcher::MediaWatcher;
