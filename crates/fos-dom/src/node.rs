//! DOM Node
//!
//! Nodes live in the tree arena and refer to each other by [`NodeId`].

use fos_media::HTMLMediaElement;

use crate::geometry::DOMRect;
use crate::shadow::ShadowRootData;
use crate::style::InlineStyle;
use crate::NodeId;

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (`None` for detached nodes, the document and shadow roots)
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self { parent: None, children: Vec::new(), data }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Get shadow root data if this node is a shadow root
    #[inline]
    pub fn as_shadow_root(&self) -> Option<&ShadowRootData> {
        match &self.data {
            NodeData::ShadowRoot(s) => Some(s),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Shadow root attached to a host element
    ShadowRoot(ShadowRootData),
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
    /// Inline style
    pub style: InlineStyle,
    /// Layout box assigned by the embedder
    pub layout: Option<DOMRect>,
    /// Size used when no layout box is assigned
    pub intrinsic_size: Option<(f64, f64)>,
    /// Attached shadow root
    pub shadow_root: Option<NodeId>,
    /// Playback state for `<video>` and `<audio>`
    pub media: Option<HTMLMediaElement>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let media = fos_media::MediaKind::from_tag(&tag).map(HTMLMediaElement::new);
        Self {
            tag,
            attrs: Vec::new(),
            style: InlineStyle::default(),
            layout: None,
            intrinsic_size: None,
            shadow_root: None,
            media,
        }
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub(crate) fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(n, _)| n != name);
    }

    /// Element id attribute
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Class list
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Media events the tree queues for the embedder to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    LoadStart,
    LoadedMetadata,
    CanPlay,
    Play,
    Pause,
    RateChange,
    Resize,
    TimeUpdate,
}

impl MediaEventKind {
    /// DOM event type name
    pub fn as_str(self) -> &'static str {
        match self {
            MediaEventKind::LoadStart => "loadstart",
            MediaEventKind::LoadedMetadata => "loadedmetadata",
            MediaEventKind::CanPlay => "canplay",
            MediaEventKind::Play => "play",
            MediaEventKind::Pause => "pause",
            MediaEventKind::RateChange => "ratechange",
            MediaEventKind::Resize => "resize",
            MediaEventKind::TimeUpdate => "timeupdate",
        }
    }
}
