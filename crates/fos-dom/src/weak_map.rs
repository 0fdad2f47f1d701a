//! Node-keyed side tables
//!
//! Entries are keyed by generational [`NodeId`], so an entry never
//! resolves for a node that reuses a released slot. Iteration follows
//! insertion order.

use std::collections::HashMap;

use crate::{DomTree, NodeId};

/// Map from node identity to a value
#[derive(Debug, Clone)]
pub struct WeakNodeMap<V> {
    entries: HashMap<NodeId, (u64, V)>,
    next_seq: u64,
}

impl<V> Default for WeakNodeMap<V> {
    fn default() -> Self {
        Self { entries: HashMap::new(), next_seq: 0 }
    }
}

impl<V> WeakNodeMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry keeps its position
    pub fn insert(&mut self, node: NodeId, value: V) -> Option<V> {
        if let Some(entry) = self.entries.get_mut(&node) {
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.entries.insert(node, (self.next_seq, value));
        self.next_seq += 1;
        None
    }

    pub fn get(&self, node: NodeId) -> Option<&V> {
        self.entries.get(&node).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut V> {
        self.entries.get_mut(&node).map(|(_, v)| v)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn remove(&mut self, node: NodeId) -> Option<V> {
        self.entries.remove(&node).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &V)> {
        let mut ordered: Vec<_> = self.entries.iter().collect();
        ordered.sort_by_key(|(_, (seq, _))| *seq);
        ordered.into_iter().map(|(id, (_, v))| (*id, v))
    }

    pub fn keys(&self) -> Vec<NodeId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Remove every entry and return the values in insertion order
    pub fn drain(&mut self) -> Vec<(NodeId, V)> {
        let mut ordered: Vec<_> = self.entries.drain().collect();
        ordered.sort_by_key(|(_, (seq, _))| *seq);
        ordered.into_iter().map(|(id, (_, v))| (id, v)).collect()
    }

    /// Drop entries whose node was released; returns the dropped values
    pub fn prune(&mut self, tree: &DomTree) -> Vec<(NodeId, V)> {
        let dead: Vec<NodeId> = self
            .entries
            .keys()
            .copied()
            .filter(|&id| !tree.contains(id))
            .collect();
        dead.into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|(_, v)| (id, v)))
            .collect()
    }
}
