//! Fallback policy for sites without dedicated rules

use fos_dom::{DomTree, NodeId};

use super::{MountPoint, closest_any};

/// Containers of common embeddable players
const PLAYER_CONTAINERS: &[&str] = &[
    ".video-js",
    ".vjs-tech",
    ".plyr",
    ".mejs-container",
    ".flowplayer",
    ".jw-wrapper",
    ".jwplayer",
    ".theoplayer-container",
    ".bitmovinplayer-container",
    ".video-container",
    ".player-container",
    ".player-wrapper",
    ".video-player",
    ".html5-video-player",
    "[data-player]",
    "[data-testid*=\"player\"]",
    "[data-testid*=\"video\"]",
];

/// Known player container, else a positioned parent
pub(super) fn mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    let parent = dom.parent_element(el)?;
    // from the parent so a media element carrying a container class is never the target
    if let Some(container) = closest_any(dom, parent, PLAYER_CONTAINERS) {
        return Some(MountPoint::prepend(container));
    }
    dom.computed_style(parent)
        .position
        .is_positioned()
        .then(|| MountPoint::prepend(parent))
}
