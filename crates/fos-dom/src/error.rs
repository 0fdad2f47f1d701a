//! DOM errors

use crate::NodeId;

/// Errors raised by tree operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} does not exist")]
    NotFound(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("inserting {child} under {parent} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("node {0} has no parent")]
    NoParent(NodeId),

    #[error("node {0} is still attached")]
    StillAttached(NodeId),

    #[error("element {0} already hosts a shadow root")]
    ShadowAlreadyAttached(NodeId),

    #[error("element {0} is not a media element")]
    NotMedia(NodeId),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error(transparent)]
    Media(#[from] fos_media::MediaError),
}
