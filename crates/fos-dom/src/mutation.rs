//! Mutation Observers
//!
//! Child-list records queued per observer. The tree appends records as
//! it mutates; the embedder drains them at its microtask checkpoint.

use std::collections::BTreeMap;

use crate::NodeId;

/// Mutation observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u32);

/// Mutation observer options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub subtree: bool,
}

impl MutationObserverInit {
    /// `{ childList: true, subtree: true }`
    pub fn subtree() -> Self {
        Self { child_list: true, subtree: true }
    }
}

/// Mutation record (child-list only)
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

#[derive(Debug, Default)]
struct Registration {
    targets: Vec<(NodeId, MutationObserverInit)>,
    records: Vec<MutationRecord>,
}

/// All observers registered on a tree
#[derive(Debug, Default)]
pub(crate) struct MutationLog {
    observers: BTreeMap<ObserverId, Registration>,
    next_id: u32,
}

impl MutationLog {
    pub fn create(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.insert(id, Registration::default());
        id
    }

    pub fn observe(&mut self, id: ObserverId, target: NodeId, options: MutationObserverInit) {
        if let Some(reg) = self.observers.get_mut(&id) {
            match reg.targets.iter_mut().find(|(t, _)| *t == target) {
                Some(entry) => entry.1 = options,
                None => reg.targets.push((target, options)),
            }
        }
    }

    /// Stop observing and drop queued records
    pub fn disconnect(&mut self, id: ObserverId) {
        if let Some(reg) = self.observers.get_mut(&id) {
            reg.targets.clear();
            reg.records.clear();
        }
    }

    pub fn remove(&mut self, id: ObserverId) {
        self.observers.remove(&id);
    }

    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(&id)
            .map(|reg| std::mem::take(&mut reg.records))
            .unwrap_or_default()
    }

    pub fn observed_targets(&self, id: ObserverId) -> Vec<NodeId> {
        self.observers
            .get(&id)
            .map(|reg| reg.targets.iter().map(|(t, _)| *t).collect())
            .unwrap_or_default()
    }

    /// Observers holding undelivered records
    pub fn pending(&self) -> Vec<ObserverId> {
        self.observers
            .iter()
            .filter(|(_, reg)| !reg.records.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Queue `record` for every observer interested in it.
    ///
    /// `scope` lists the target followed by its ancestors within the same
    /// tree (shadow boundaries are not crossed).
    pub fn enqueue(&mut self, record: &MutationRecord, scope: &[NodeId]) {
        for reg in self.observers.values_mut() {
            let interested = reg.targets.iter().any(|(observed, options)| {
                options.child_list
                    && (*observed == record.target
                        || (options.subtree && scope.contains(observed)))
            });
            if interested {
                reg.records.push(record.clone());
            }
        }
    }
}
