//! Shadow DOM v1
//!
//! Shadow roots are arena nodes without a parent; the host link lives
//! in [`ShadowRootData`]. Closed roots are only reachable through the
//! privileged accessors on [`crate::DomTree`].

use std::sync::Arc;

use crate::NodeId;

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

/// Constructed stylesheet that shadow roots can adopt
#[derive(Debug, PartialEq, Eq)]
pub struct StyleSheet {
    css: String,
}

impl StyleSheet {
    pub fn new(css: impl Into<String>) -> Self {
        Self { css: css.into() }
    }

    pub fn css_text(&self) -> &str {
        &self.css
    }
}

/// Shadow root data
#[derive(Debug, Clone)]
pub struct ShadowRootData {
    pub host: NodeId,
    pub mode: ShadowRootMode,
    /// Adopted stylesheets, shared between roots
    pub adopted_style_sheets: Vec<Arc<StyleSheet>>,
}

impl ShadowRootData {
    pub(crate) fn new(host: NodeId, mode: ShadowRootMode) -> Self {
        Self { host, mode, adopted_style_sheets: Vec::new() }
    }
}
