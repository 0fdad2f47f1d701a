//! fOS Page
//!
//! Single-threaded page runtime over the fOS DOM: capture/bubble event
//! dispatch across shadow boundaries, a virtual-clock event loop with
//! timers, animation frames and idle callbacks, and mutation/resize
//! observer delivery.

mod event;
mod event_loop;
mod listeners;
mod observers;
mod page;

pub use event::{Event, EventTarget, EventType, KeyboardData, ListenerOptions, Modifiers, PointerData};
pub use event_loop::{FrameId, IdleId, TimerId, FRAME_MS};
pub use listeners::{ListenerFn, ListenerId};
pub use observers::{MutationCallback, ResizeCallback, ResizeObserverEntry, ResizeObserverId};
pub use page::{Capabilities, Page, PageOptions};
