//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree with generational node ids, shadow roots,
//! selector matching, mutation records and a small layout model.

mod error;
mod generation;
mod geometry;
mod mutation;
mod node;
mod selector;
mod shadow;
mod style;
mod tree;
mod weak_map;

pub use error::DomError;
pub use generation::Generation;
pub use geometry::DOMRect;
pub use mutation::{MutationObserverInit, MutationRecord, ObserverId};
pub use node::{ElementData, MediaEventKind, Node, NodeData};
pub use selector::{Selector, SelectorList};
pub use shadow::{ShadowRootData, ShadowRootMode, StyleSheet};
pub use style::{ComputedStyle, InlineStyle, Position};
pub use tree::DomTree;
pub use weak_map::WeakNodeMap;

/// Node identifier (arena slot plus generation)
///
/// A released slot bumps its generation, so a stale id never
/// resolves to whatever node reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: Generation,
}

impl NodeId {
    /// Document node ID
    pub const ROOT: NodeId = NodeId { index: 0, generation: Generation::INITIAL };

    pub(crate) fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Arena slot
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> Generation {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation.value())
    }
}
