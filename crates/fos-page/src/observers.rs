//! Observer registries
//!
//! Mutation observer callbacks keyed by the tree's observer ids, and
//! resize observers that compare element sizes at frame boundaries.

use std::collections::HashMap;
use std::rc::Rc;

use fos_dom::{DomTree, MutationRecord, NodeId, ObserverId};

/// Mutation observer callback
pub type MutationCallback = Rc<dyn Fn(Vec<MutationRecord>)>;

/// Resize observer callback
pub type ResizeCallback = Rc<dyn Fn(Vec<ResizeObserverEntry>)>;

/// ResizeObserver handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeObserverId(u64);

/// Resize observer entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeObserverEntry {
    pub target: NodeId,
    pub width: f64,
    pub height: f64,
}

#[derive(Default)]
pub(crate) struct MutationCallbacks {
    callbacks: HashMap<ObserverId, MutationCallback>,
}

impl MutationCallbacks {
    pub fn insert(&mut self, id: ObserverId, callback: MutationCallback) {
        self.callbacks.insert(id, callback);
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    pub fn get(&self, id: ObserverId) -> Option<MutationCallback> {
        self.callbacks.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

struct ResizeRegistration {
    /// Observed targets with the last reported size
    targets: Vec<(NodeId, Option<(f64, f64)>)>,
    callback: ResizeCallback,
}

#[derive(Default)]
pub(crate) struct ResizeObservers {
    observers: Vec<(ResizeObserverId, ResizeRegistration)>,
    next_id: u64,
}

impl ResizeObservers {
    pub fn create(&mut self, callback: ResizeCallback) -> ResizeObserverId {
        let id = ResizeObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, ResizeRegistration { targets: Vec::new(), callback }));
        id
    }

    pub fn observe(&mut self, id: ResizeObserverId, target: NodeId) {
        if let Some((_, reg)) = self.observers.iter_mut().find(|(o, _)| *o == id) {
            if !reg.targets.iter().any(|(t, _)| *t == target) {
                reg.targets.push((target, None));
            }
        }
    }

    pub fn disconnect(&mut self, id: ResizeObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(o, _)| *o != id);
        before != self.observers.len()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Compare current sizes with the last reported ones. The first check
    /// of a target always reports.
    pub fn check_sizes(&mut self, tree: &DomTree) -> Vec<(ResizeCallback, Vec<ResizeObserverEntry>)> {
        let mut out = Vec::new();
        for (_, reg) in &mut self.observers {
            let mut entries = Vec::new();
            for (target, last) in &mut reg.targets {
                let rect = tree.bounding_client_rect(*target);
                let size = (rect.width, rect.height);
                if *last != Some(size) {
                    *last = Some(size);
                    entries.push(ResizeObserverEntry { target: *target, width: size.0, height: size.1 });
                }
            }
            if !entries.is_empty() {
                out.push((reg.callback.clone(), entries));
            }
        }
        out
    }
}
