//! DOM Tree (arena-based allocation)
//!
//! Nodes are stored in slots addressed by [`NodeId`]. Structural changes
//! queue child-list mutation records for registered observers, and media
//! state changes queue media events for the embedder to dispatch.

use std::collections::VecDeque;
use std::sync::Arc;

use fos_media::{HTMLMediaElement, ReadyState};

use crate::generation::Generation;
use crate::geometry::DOMRect;
use crate::mutation::{MutationLog, MutationObserverInit, MutationRecord, ObserverId};
use crate::node::{ElementData, MediaEventKind, Node, NodeData};
use crate::selector::SelectorList;
use crate::shadow::{ShadowRootData, ShadowRootMode, StyleSheet};
use crate::style::{ComputedStyle, InlineStyle};
use crate::{DomError, NodeId};

#[derive(Debug)]
struct Slot {
    generation: Generation,
    node: Option<Node>,
}

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    mutations: MutationLog,
    media_events: VecDeque<(NodeId, MediaEventKind)>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a document with `<html>`, `<head>` and `<body>`
    pub fn new() -> Self {
        let mut tree = Self {
            slots: vec![Slot { generation: Generation::INITIAL, node: Some(Node::new(NodeData::Document)) }],
            free: Vec::new(),
            html: NodeId::ROOT,
            head: NodeId::ROOT,
            body: NodeId::ROOT,
            mutations: MutationLog::default(),
            media_events: VecDeque::new(),
        };
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");
        tree.link(NodeId::ROOT, html, 0);
        tree.link(html, head, 0);
        tree.link(html, body, 1);
        tree.html = html;
        tree.head = head;
        tree.body = body;
        tree
    }

    // ---- arena ----

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node::new(data);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot { generation: Generation::INITIAL, node: Some(node) });
                NodeId::new((self.slots.len() - 1) as u32, Generation::INITIAL)
            }
        }
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    /// Whether `id` still refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- document ----

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn document_element(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    // ---- navigation ----

    pub fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        self.node(id)?.as_element().ok_or(DomError::NotAnElement(id))
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Lowercase tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Parent, if it is an element (a shadow root or the document is not)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Light-tree descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Host of a shadow root
    pub fn host(&self, shadow: NodeId) -> Option<NodeId> {
        self.get(shadow)?.as_shadow_root().map(|s| s.host)
    }

    /// Parent in the flat tree: shadow roots continue at their host
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        match &node.data {
            NodeData::ShadowRoot(shadow) => Some(shadow.host),
            _ => node.parent,
        }
    }

    /// Topmost light-tree ancestor (document, shadow root or detached root)
    pub fn root_node(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Connected to the document, possibly through shadow hosts
    pub fn is_connected(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = id;
        loop {
            let root = self.root_node(current);
            if root == NodeId::ROOT {
                return true;
            }
            match self.host(root) {
                Some(host) => current = host,
                None => return false,
            }
        }
    }

    fn is_host_including_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.composed_parent(id);
        }
        false
    }

    // ---- mutation ----

    fn link(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(p) = self.get_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn record(&mut self, record: MutationRecord) {
        let mut scope = Vec::new();
        let mut current = Some(record.target);
        while let Some(id) = current {
            scope.push(id);
            current = self.parent(id);
        }
        self.mutations.enqueue(&record, &scope);
    }

    fn sibling_at(&self, parent: NodeId, index: isize) -> Option<NodeId> {
        if index < 0 {
            return None;
        }
        self.children(parent).get(index as usize).copied()
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        let Some(index) = self.children(parent).iter().position(|&c| c == child) else {
            return;
        };
        let previous_sibling = self.sibling_at(parent, index as isize - 1);
        let next_sibling = self.sibling_at(parent, index as isize + 1);
        if let Some(p) = self.get_mut(parent) {
            p.children.remove(index);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
        self.record(MutationRecord {
            target: parent,
            added_nodes: Vec::new(),
            removed_nodes: vec![child],
            previous_sibling,
            next_sibling,
        });
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if matches!(parent_node.data, NodeData::Text(_)) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if matches!(child_node.data, NodeData::Document | NodeData::ShadowRoot(_)) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if self.is_host_including_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Insert `child` into `parent` at `index`, moving it if attached elsewhere
    fn insert_at(&mut self, parent: NodeId, child: NodeId, index: impl FnOnce(&Self) -> usize) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let index = index(self).min(self.children(parent).len());
        let previous_sibling = self.sibling_at(parent, index as isize - 1);
        let next_sibling = self.sibling_at(parent, index as isize);
        self.link(parent, child, index);
        self.record(MutationRecord {
            target: parent,
            added_nodes: vec![child],
            removed_nodes: Vec::new(),
            previous_sibling,
            next_sibling,
        });
        Ok(())
    }

    /// Append child to parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_at(parent, child, |tree| tree.children(parent).len())
    }

    /// Insert child as the first child of parent
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_at(parent, child, |_| 0)
    }

    /// Insert `node` as the previous sibling of `reference`
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::NoParent(reference))?;
        self.insert_at(parent, node, |tree| {
            tree.children(parent).iter().position(|&c| c == reference).unwrap_or(0)
        })
    }

    /// Insert `node` as the next sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::NoParent(reference))?;
        self.insert_at(parent, node, |tree| {
            tree.children(parent)
                .iter()
                .position(|&c| c == reference)
                .map_or(usize::MAX, |i| i + 1)
        })
    }

    /// Detach a node from its parent; a no-op for detached nodes
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        self.detach(id);
        Ok(())
    }

    /// Free a detached subtree, including shadow trees hosted inside it.
    ///
    /// Ids into the subtree stop resolving afterwards.
    pub fn release(&mut self, id: NodeId) -> Result<(), DomError> {
        let node = self.node(id)?;
        if node.parent.is_some() || id == NodeId::ROOT || node.as_shadow_root().is_some() {
            return Err(DomError::StillAttached(id));
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(slot) = self.slots.get_mut(next.index() as usize) else {
                continue;
            };
            if slot.generation != next.generation() {
                continue;
            }
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.next();
            self.free.push(next.index());
            if let Some(shadow) = node.as_element().and_then(|e| e.shadow_root) {
                stack.push(shadow);
            }
            stack.extend(node.children);
        }
        let slots = &self.slots;
        self.media_events.retain(|(target, _)| {
            slots
                .get(target.index() as usize)
                .is_some_and(|s| s.generation == target.generation() && s.node.is_some())
        });
        Ok(())
    }

    // ---- attributes ----

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.set_attr(name, value);
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?.remove_attr(name);
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.get(id)
            .and_then(Node::as_element)
            .is_some_and(|e| e.has_class(class))
    }

    /// Add or remove a class; returns whether the class is now present
    pub fn toggle_class(&mut self, id: NodeId, class: &str, force: Option<bool>) -> Result<bool, DomError> {
        let el = self.element_mut(id)?;
        let present = el.has_class(class);
        let want = force.unwrap_or(!present);
        if want != present {
            let mut classes: Vec<String> = el.classes().map(str::to_string).collect();
            if want {
                classes.push(class.to_string());
            } else {
                classes.retain(|c| c != class);
            }
            el.set_attr("class", &classes.join(" "));
        }
        Ok(want)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.toggle_class(id, class, Some(true)).map(|_| ())
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.toggle_class(id, class, Some(false)).map(|_| ())
    }

    // ---- style ----

    pub fn style(&self, id: NodeId) -> Option<&InlineStyle> {
        self.get(id)?.as_element().map(|e| &e.style)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.style.set(property, value);
        Ok(())
    }

    pub fn computed_style(&self, id: NodeId) -> ComputedStyle {
        self.style(id).map(ComputedStyle::from_inline).unwrap_or_default()
    }

    // ---- text ----

    /// Concatenated text of all light-tree descendants
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    /// Replace the content of `id` with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let children = self.node(id)?.children.clone();
        if let [only] = children.as_slice() {
            if let Some(Node { data: NodeData::Text(content), .. }) = self.get_mut(*only) {
                *content = text.to_string();
                return Ok(());
            }
        }
        for child in children {
            self.detach(child);
            self.release(child)?;
        }
        let node = self.create_text(text);
        self.append_child(id, node)
    }

    // ---- shadow DOM ----

    /// Attach a shadow root to `host`
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<NodeId, DomError> {
        if self.element(host)?.shadow_root.is_some() {
            return Err(DomError::ShadowAlreadyAttached(host));
        }
        let shadow = self.alloc(NodeData::ShadowRoot(ShadowRootData::new(host, mode)));
        self.element_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    /// Open shadow root (`element.shadowRoot`)
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        let shadow = self.shadow_root_privileged(host)?;
        let data = self.get(shadow)?.as_shadow_root()?;
        (data.mode == ShadowRootMode::Open).then_some(shadow)
    }

    /// Shadow root regardless of mode
    pub fn shadow_root_privileged(&self, host: NodeId) -> Option<NodeId> {
        self.get(host)?.as_element()?.shadow_root
    }

    pub fn adopt_style_sheet(&mut self, shadow: NodeId, sheet: Arc<StyleSheet>) -> Result<(), DomError> {
        match self.get_mut(shadow).map(|n| &mut n.data) {
            Some(NodeData::ShadowRoot(data)) => {
                data.adopted_style_sheets.push(sheet);
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement(shadow)),
            None => Err(DomError::NotFound(shadow)),
        }
    }

    pub fn adopted_style_sheets(&self, shadow: NodeId) -> &[Arc<StyleSheet>] {
        self.get(shadow)
            .and_then(Node::as_shadow_root)
            .map(|s| s.adopted_style_sheets.as_slice())
            .unwrap_or(&[])
    }

    // ---- selectors ----

    /// Match an element against a selector list; invalid selectors never match
    pub fn matches(&self, id: NodeId, selectors: &str) -> bool {
        let Some(el) = self.get(id).and_then(Node::as_element) else {
            return false;
        };
        match SelectorList::parse(selectors) {
            Ok(list) => list.matches(el),
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }

    /// Nearest inclusive ancestor element matching `selectors`
    pub fn closest(&self, id: NodeId, selectors: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selectors).ok()?;
        let mut current = Some(id);
        while let Some(node) = current {
            match self.get(node).and_then(Node::as_element) {
                Some(el) if list.matches(el) => return Some(node),
                Some(_) => current = self.parent(node),
                None => return None,
            }
        }
        None
    }

    /// First light-tree descendant matching `selectors`
    pub fn query_selector(&self, root: NodeId, selectors: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selectors).ok()?;
        self.descendants(root)
            .into_iter()
            .find(|&d| self.get(d).and_then(Node::as_element).is_some_and(|e| list.matches(e)))
    }

    /// All light-tree descendants matching `selectors`
    pub fn query_selector_all(&self, root: NodeId, selectors: &str) -> Vec<NodeId> {
        let Ok(list) = SelectorList::parse(selectors) else {
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|&d| self.get(d).and_then(Node::as_element).is_some_and(|e| list.matches(e)))
            .collect()
    }

    // ---- layout ----

    /// Assign a layout box (page coordinates)
    pub fn set_layout_rect(&mut self, id: NodeId, rect: DOMRect) -> Result<(), DomError> {
        self.element_mut(id)?.layout = Some(rect);
        Ok(())
    }

    /// Size used when an element has no layout box; it is placed at its
    /// containing node's origin plus any translate transform
    pub fn set_intrinsic_size(&mut self, id: NodeId, width: f64, height: f64) -> Result<(), DomError> {
        self.element_mut(id)?.intrinsic_size = Some((width, height));
        Ok(())
    }

    /// `getBoundingClientRect()`
    pub fn bounding_client_rect(&self, id: NodeId) -> DOMRect {
        if !self.is_connected(id) {
            return DOMRect::default();
        }
        let Some(node) = self.get(id) else {
            return DOMRect::default();
        };
        let el = match &node.data {
            NodeData::Element(el) => el,
            NodeData::ShadowRoot(shadow) => return self.bounding_client_rect(shadow.host),
            _ => return DOMRect::default(),
        };
        let computed = ComputedStyle::from_inline(&el.style);
        if computed.display_none {
            return DOMRect::default();
        }
        let (dx, dy) = computed.translation();
        if let Some(layout) = el.layout {
            return layout.translated(dx, dy);
        }
        let base = self
            .composed_parent(id)
            .filter(|&p| p != NodeId::ROOT)
            .map(|p| self.bounding_client_rect(p))
            .unwrap_or_default();
        let (width, height) = el.intrinsic_size.unwrap_or((0.0, 0.0));
        DOMRect::from_xywh(base.x + dx, base.y + dy, width, height)
    }

    pub fn offset_width(&self, id: NodeId) -> f64 {
        self.bounding_client_rect(id).width
    }

    pub fn offset_height(&self, id: NodeId) -> f64 {
        self.bounding_client_rect(id).height
    }

    /// Nearest positioned or transformed ancestor, else `<body>`
    pub fn offset_parent(&self, id: NodeId) -> Option<NodeId> {
        if !self.is_connected(id) || self.computed_style(id).display_none {
            return None;
        }
        let mut current = self.composed_parent(id);
        while let Some(ancestor) = current {
            if ancestor == self.body {
                return Some(ancestor);
            }
            if self.is_element(ancestor) {
                let style = self.computed_style(ancestor);
                if style.position.is_positioned() || style.transform.is_some() {
                    return Some(ancestor);
                }
            }
            current = self.composed_parent(ancestor);
        }
        Some(self.body)
    }

    // ---- media ----

    pub fn media(&self, id: NodeId) -> Option<&HTMLMediaElement> {
        self.get(id)?.as_element()?.media.as_ref()
    }

    /// Direct access to media state; no events are queued
    pub fn media_mut(&mut self, id: NodeId) -> Option<&mut HTMLMediaElement> {
        self.get_mut(id)?.as_element_mut()?.media.as_mut()
    }

    fn media_or_err(&mut self, id: NodeId) -> Result<&mut HTMLMediaElement, DomError> {
        self.element_mut(id)?.media.as_mut().ok_or(DomError::NotMedia(id))
    }

    /// Queue a media event for the embedder
    pub fn queue_media_event(&mut self, id: NodeId, kind: MediaEventKind) {
        self.media_events.push_back((id, kind));
    }

    /// Drain queued media events in order
    pub fn take_media_events(&mut self) -> Vec<(NodeId, MediaEventKind)> {
        self.media_events.drain(..).collect()
    }

    /// Next queued media event
    pub fn pop_media_event(&mut self) -> Option<(NodeId, MediaEventKind)> {
        self.media_events.pop_front()
    }

    /// Write `playbackRate`; queues `ratechange` when the rate changes
    pub fn set_playback_rate(&mut self, id: NodeId, rate: f64) -> Result<(), DomError> {
        if self.media_or_err(id)?.set_playback_rate(rate)? {
            self.queue_media_event(id, MediaEventKind::RateChange);
        }
        Ok(())
    }

    pub fn play(&mut self, id: NodeId) -> Result<(), DomError> {
        if self.media_or_err(id)?.play() {
            self.queue_media_event(id, MediaEventKind::Play);
        }
        Ok(())
    }

    pub fn pause(&mut self, id: NodeId) -> Result<(), DomError> {
        let media = self.media_or_err(id)?;
        if !media.paused {
            media.pause();
            self.queue_media_event(id, MediaEventKind::Pause);
        }
        Ok(())
    }

    /// Start loading a new source; queues `loadstart`
    pub fn load(&mut self, id: NodeId, src: &str) -> Result<(), DomError> {
        self.media_or_err(id)?.load(src);
        self.queue_media_event(id, MediaEventKind::LoadStart);
        Ok(())
    }

    /// Advance the ready state, queueing `loadedmetadata` and `canplay`
    /// as thresholds are crossed
    pub fn set_ready_state(&mut self, id: NodeId, state: ReadyState) -> Result<(), DomError> {
        let media = self.media_or_err(id)?;
        let old = media.ready_state;
        media.ready_state = state;
        if old < ReadyState::HaveMetadata && state >= ReadyState::HaveMetadata {
            self.queue_media_event(id, MediaEventKind::LoadedMetadata);
        }
        if old < ReadyState::HaveFutureData && state >= ReadyState::HaveFutureData {
            self.queue_media_event(id, MediaEventKind::CanPlay);
        }
        Ok(())
    }

    /// Seek relative to the current time
    pub fn seek_by(&mut self, id: NodeId, delta: f64) -> Result<(), DomError> {
        self.media_or_err(id)?.seek_by(delta)?;
        self.queue_media_event(id, MediaEventKind::TimeUpdate);
        Ok(())
    }

    // ---- mutation observers ----

    pub fn create_observer(&mut self) -> ObserverId {
        self.mutations.create()
    }

    pub fn observe(&mut self, observer: ObserverId, target: NodeId, options: MutationObserverInit) {
        self.mutations.observe(observer, target, options);
    }

    pub fn disconnect_observer(&mut self, observer: ObserverId) {
        self.mutations.disconnect(observer);
    }

    pub fn remove_observer(&mut self, observer: ObserverId) {
        self.mutations.remove(observer);
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.mutations.take_records(observer)
    }

    pub fn observed_targets(&self, observer: ObserverId) -> Vec<NodeId> {
        self.mutations.observed_targets(observer)
    }

    /// Observers with undelivered records
    pub fn pending_observers(&self) -> Vec<ObserverId> {
        self.mutations.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_skeleton() {
        let tree = DomTree::new();
        assert_eq!(tree.tag_name(tree.body()), Some("body"));
        assert_eq!(tree.parent(tree.body()), Some(tree.document_element()));
        assert!(tree.is_connected(tree.body()));
    }

    #[test]
    fn test_append_and_move() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        let body = tree.body();
        tree.append_child(body, a).unwrap();
        tree.append_child(body, b).unwrap();
        let child = tree.create_element("span");
        tree.append_child(a, child).unwrap();
        tree.append_child(b, child).unwrap();
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[child]);
        assert_eq!(tree.parent_element(child), Some(b));
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut tree = DomTree::new();
        let body = tree.body();
        let mid = tree.create_element("p");
        tree.append_child(body, mid).unwrap();
        let first = tree.create_element("p");
        let last = tree.create_element("p");
        tree.insert_before(mid, first).unwrap();
        tree.insert_after(mid, last).unwrap();
        assert_eq!(tree.children(body), &[first, mid, last]);

        let loose = tree.create_element("p");
        assert_eq!(tree.insert_before(loose, first), Err(DomError::NoParent(loose)));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(outer, inner).unwrap();
        assert!(matches!(
            tree.append_child(inner, outer),
            Err(DomError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_release_invalidates_ids() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        tree.append_child(div, span).unwrap();
        tree.release(div).unwrap();
        assert!(!tree.contains(div));
        assert!(!tree.contains(span));

        let reused = tree.create_element("p");
        assert!(reused != div && reused != span);
        assert!(tree.contains(reused));
        assert!(tree.get(div).is_none());
    }

    #[test]
    fn test_release_frees_hosted_shadow_trees() {
        let mut tree = DomTree::new();
        let wrap = tree.create_element("div");
        let host = tree.create_element("my-player");
        tree.append_child(wrap, host).unwrap();
        let shadow = tree.attach_shadow(host, ShadowRootMode::Closed).unwrap();
        let video = tree.create_element("video");
        tree.append_child(shadow, video).unwrap();
        let caption = tree.create_element("span");
        tree.append_child(host, caption).unwrap();
        tree.queue_media_event(video, MediaEventKind::Play);

        tree.release(wrap).unwrap();
        for id in [wrap, host, shadow, video, caption] {
            assert!(!tree.contains(id));
        }
        assert!(tree.pop_media_event().is_none());
    }

    #[test]
    fn test_release_requires_detached() {
        let mut tree = DomTree::new();
        let body = tree.body();
        let div = tree.create_element("div");
        tree.append_child(body, div).unwrap();
        assert_eq!(tree.release(div), Err(DomError::StillAttached(div)));
    }

    #[test]
    fn test_shadow_connectivity() {
        let mut tree = DomTree::new();
        let host = tree.create_element("div");
        let shadow = tree.attach_shadow(host, ShadowRootMode::Closed).unwrap();
        let video = tree.create_element("video");
        tree.append_child(shadow, video).unwrap();
        assert!(!tree.is_connected(video));

        let body = tree.body();
        tree.append_child(body, host).unwrap();
        assert!(tree.is_connected(video));
        assert_eq!(tree.shadow_root(host), None);
        assert_eq!(tree.shadow_root_privileged(host), Some(shadow));
        assert_eq!(tree.composed_parent(shadow), Some(host));
        assert_eq!(tree.parent_element(video), None);
        assert!(matches!(
            tree.attach_shadow(host, ShadowRootMode::Open),
            Err(DomError::ShadowAlreadyAttached(_))
        ));
    }

    #[test]
    fn test_mutation_records_scope() {
        let mut tree = DomTree::new();
        let observer = tree.create_observer();
        let root = tree.root();
        tree.observe(observer, root, MutationObserverInit::subtree());

        let body = tree.body();
        let div = tree.create_element("div");
        tree.append_child(body, div).unwrap();
        let records = tree.take_records(observer);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, body);
        assert_eq!(records[0].added_nodes, vec![div]);

        // Changes inside a shadow tree are not visible to document observers
        let shadow = tree.attach_shadow(div, ShadowRootMode::Open).unwrap();
        let inner = tree.create_element("span");
        tree.append_child(shadow, inner).unwrap();
        assert!(tree.take_records(observer).is_empty());

        tree.remove(div).unwrap();
        let records = tree.take_records(observer);
        assert_eq!(records[0].removed_nodes, vec![div]);
    }

    #[test]
    fn test_classes() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.add_class(div, "a").unwrap();
        tree.add_class(div, "b").unwrap();
        assert_eq!(tree.attr(div, "class"), Some("a b"));
        assert!(!tree.toggle_class(div, "a", None).unwrap());
        assert!(tree.has_class(div, "b"));
        assert!(!tree.has_class(div, "a"));
    }

    #[test]
    fn test_closest_and_query() {
        let mut tree = DomTree::new();
        let body = tree.body();
        let player = tree.create_element("div");
        tree.set_attr(player, "class", "html5-video-player").unwrap();
        let container = tree.create_element("div");
        let video = tree.create_element("video");
        tree.append_child(body, player).unwrap();
        tree.append_child(player, container).unwrap();
        tree.append_child(container, video).unwrap();

        assert_eq!(tree.closest(video, ".html5-video-player"), Some(player));
        assert_eq!(tree.closest(video, ".missing"), None);
        assert_eq!(tree.query_selector(body, "video"), Some(video));
        assert_eq!(tree.query_selector_all(tree.root(), "div").len(), 2);
        assert!(tree.matches(video, "video"));
    }

    #[test]
    fn test_layout_model() {
        let mut tree = DomTree::new();
        let body = tree.body();
        let parent = tree.create_element("div");
        tree.append_child(body, parent).unwrap();
        tree.set_layout_rect(parent, DOMRect::from_xywh(100.0, 50.0, 640.0, 360.0)).unwrap();

        let overlay = tree.create_element("div");
        tree.append_child(parent, overlay).unwrap();
        tree.set_intrinsic_size(overlay, 60.0, 24.0).unwrap();
        tree.set_style(overlay, "transform", "translate(10px, 20px)").unwrap();
        assert_eq!(
            tree.bounding_client_rect(overlay),
            DOMRect::from_xywh(110.0, 70.0, 60.0, 24.0)
        );

        assert_eq!(tree.offset_parent(overlay), Some(body));
        tree.set_style(parent, "position", "relative").unwrap();
        assert_eq!(tree.offset_parent(overlay), Some(parent));

        tree.remove(parent).unwrap();
        assert_eq!(tree.offset_width(overlay), 0.0);
        assert_eq!(tree.offset_parent(overlay), None);
    }

    #[test]
    fn test_media_events() {
        let mut tree = DomTree::new();
        let video = tree.create_element("video");
        tree.set_playback_rate(video, 2.0).unwrap();
        tree.set_playback_rate(video, 2.0).unwrap();
        tree.set_ready_state(video, ReadyState::HaveEnoughData).unwrap();
        tree.play(video).unwrap();
        let kinds: Vec<_> = tree.take_media_events().into_iter().map(|(_, k)| k).collect();
        assert_eq!(
            kinds,
            vec![
                MediaEventKind::RateChange,
                MediaEventKind::LoadedMetadata,
                MediaEventKind::CanPlay,
                MediaEventKind::Play,
            ]
        );

        let div = tree.create_element("div");
        assert_eq!(tree.set_playback_rate(div, 2.0), Err(DomError::NotMedia(div)));
    }

    #[test]
    fn test_set_text_content() {
        let mut tree = DomTree::new();
        let span = tree.create_element("span");
        tree.set_text_content(span, "1.00x").unwrap();
        tree.set_text_content(span, "1.50x").unwrap();
        assert_eq!(tree.children(span).len(), 1);
        assert_eq!(tree.text_content(span), "1.50x");
    }
}
