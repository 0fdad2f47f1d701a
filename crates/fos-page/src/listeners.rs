//! Event listener registry

use std::rc::Rc;

use crate::event::{Event, EventTarget, EventType, ListenerOptions};

/// Listener callback
pub type ListenerFn = Rc<dyn Fn(&mut Event)>;

/// Handle returned by `add_event_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    target: EventTarget,
    event_type: EventType,
    options: ListenerOptions,
    callback: ListenerFn,
}

/// Listeners in registration order
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn add(
        &mut self,
        target: EventTarget,
        event_type: EventType,
        options: ListenerOptions,
        callback: ListenerFn,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener { id, target, event_type, options, callback });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        before != self.listeners.len()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|l| l.id == id)
    }

    /// Snapshot of listeners for one phase at one target
    pub fn matching(&self, target: EventTarget, event_type: EventType, capture: bool) -> Vec<(ListenerId, bool, ListenerFn)> {
        self.listeners
            .iter()
            .filter(|l| l.target == target && l.event_type == event_type && l.options.capture == capture)
            .map(|l| (l.id, l.options.once, l.callback.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}
