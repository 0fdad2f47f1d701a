//! Tree Scanner
//!
//! One-shot deep enumeration of media elements below a root, descending
//! into every readable shadow root.

use std::collections::HashSet;

use fos_dom::{DomTree, NodeId};
use fos_media::MediaKind;

use crate::constants::{controller, observer};
use crate::shadow_access::ShadowAccess;

/// Whether `id` is a `<video>`, or an `<audio>` when audio is included
pub fn is_target_media(dom: &DomTree, id: NodeId, include_audio: bool) -> bool {
    match dom.media(id).map(|m| m.kind) {
        Some(MediaKind::Video) => true,
        Some(MediaKind::Audio) => include_audio,
        None => false,
    }
}

/// Connected media element
pub fn is_valid_media(dom: &DomTree, id: NodeId) -> bool {
    dom.media(id).is_some() && dom.is_connected(id)
}

/// Every connected target media element below `root`, in depth-first order
pub fn find_all_media(dom: &DomTree, root: NodeId, include_audio: bool, access: ShadowAccess) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    collect_media(dom, root, access, 0, &mut |id| {
        if is_target_media(dom, id, include_audio) && dom.is_connected(id) && seen.insert(id) {
            found.push(id);
        }
    });
    found
}

/// Walk `root` and every shadow tree hosted below it, calling `visit` for
/// each media element regardless of connectivity. Returns the shadow roots
/// that were entered.
pub(crate) fn collect_media(
    dom: &DomTree,
    root: NodeId,
    access: ShadowAccess,
    depth: usize,
    visit: &mut dyn FnMut(NodeId),
) -> Vec<NodeId> {
    let mut shadows = Vec::new();
    walk(dom, root, access, depth, visit, &mut shadows);
    shadows
}

fn walk(
    dom: &DomTree,
    root: NodeId,
    access: ShadowAccess,
    depth: usize,
    visit: &mut dyn FnMut(NodeId),
    shadows: &mut Vec<NodeId>,
) {
    if depth > observer::MAX_SHADOW_DEPTH {
        tracing::warn!("Shadow nesting deeper than {} - not descending", observer::MAX_SHADOW_DEPTH);
        return;
    }
    let mut candidates = vec![root];
    candidates.extend(dom.descendants(root));
    for node in candidates {
        match dom.tag_name(node) {
            Some(controller::TAG) => continue,
            Some(_) => {}
            None => continue,
        }
        if dom.media(node).is_some() {
            visit(node);
        }
        if let Some(shadow) = access.shadow_root(dom, node) {
            shadows.push(shadow);
            walk(dom, shadow, access, depth + 1, visit, shadows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::ShadowRootMode;

    /// body > host1 #shadow > host2 #shadow > ... > video
    fn nested(dom: &mut DomTree, depth: usize, mode: ShadowRootMode) -> NodeId {
        let mut parent = dom.body();
        for _ in 0..depth {
            let host = dom.create_element("div");
            dom.append_child(parent, host).unwrap();
            parent = dom.attach_shadow(host, mode).unwrap();
        }
        let video = dom.create_element("video");
        dom.append_child(parent, video).unwrap();
        video
    }

    #[test]
    fn test_finds_media_at_any_depth() {
        for depth in [0, 1, 3] {
            let mut dom = DomTree::new();
            let video = nested(&mut dom, depth, ShadowRootMode::Open);
            let found = find_all_media(&dom, dom.root(), false, ShadowAccess::OpenOnly);
            assert_eq!(found, vec![video], "depth {depth}");
        }
    }

    #[test]
    fn test_closed_roots_need_privilege() {
        let mut dom = DomTree::new();
        let video = nested(&mut dom, 2, ShadowRootMode::Closed);
        assert!(find_all_media(&dom, dom.root(), false, ShadowAccess::OpenOnly).is_empty());
        assert_eq!(
            find_all_media(&dom, dom.root(), false, ShadowAccess::Privileged),
            vec![video]
        );
    }

    #[test]
    fn test_audio_gating_and_connectivity() {
        let mut dom = DomTree::new();
        let body = dom.body();
        let audio = dom.create_element("audio");
        dom.append_child(body, audio).unwrap();
        let _detached = dom.create_element("video");

        assert!(find_all_media(&dom, dom.root(), false, ShadowAccess::OpenOnly).is_empty());
        assert_eq!(
            find_all_media(&dom, dom.root(), true, ShadowAccess::OpenOnly),
            vec![audio]
        );
    }

    #[test]
    fn test_skips_overlay_subtrees() {
        let mut dom = DomTree::new();
        let body = dom.body();
        let overlay = dom.create_element(controller::TAG);
        dom.append_child(body, overlay).unwrap();
        let shadow = dom.attach_shadow(overlay, ShadowRootMode::Open).unwrap();
        let video = dom.create_element("video");
        dom.append_child(shadow, video).unwrap();
        assert!(find_all_media(&dom, dom.root(), false, ShadowAccess::Privileged).is_empty());
    }
}
