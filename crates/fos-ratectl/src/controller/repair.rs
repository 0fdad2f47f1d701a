//! Mounting and self-repair
//!
//! Player frameworks rebuild their chrome, drop inline styles and move
//! nodes around. A periodic check puts the overlay back where its policy
//! wants it and restores the positioning context it depends on.

use fos_dom::{DomError, DomTree, NodeId};

use super::{Controller, ControllerState};
use crate::constants::timing;
use crate::sites::{MountPoint, Placement, SitePolicy};

/// What [`Controller::verify_and_repair`] fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// Overlay was detached or under the wrong parent
    Remounted,
    /// Mount parent had lost its positioning
    PositioningRestored,
}

enum Finding {
    Misplaced,
    Unpositioned(NodeId),
}

/// Policy mount point if its target is in the document, else the media's
/// own parent
fn resolve_mount(dom: &DomTree, policy: SitePolicy, media: NodeId) -> Option<MountPoint> {
    if let Some(point) = policy.mount_point(dom, media) {
        if dom.is_connected(point.target) {
            return Some(point);
        }
    }
    dom.parent(media)
        .filter(|&parent| parent != NodeId::ROOT)
        .map(MountPoint::prepend)
}

/// Make `parent` a containing block. Only static, untransformed elements
/// are touched; returns whether anything changed.
fn ensure_positioning_context(dom: &mut DomTree, parent: NodeId) -> Result<bool, DomError> {
    if !dom.is_element(parent) {
        return Ok(false);
    }
    let style = dom.computed_style(parent);
    if style.position.is_positioned() || style.transform.is_some() {
        return Ok(false);
    }
    dom.set_style(parent, "position", "relative")?;
    Ok(true)
}

impl Controller {
    /// Insert the overlay at the policy's mount point
    pub(super) fn mount(&self) -> Result<(), DomError> {
        let (page, policy, media, wrapper) = {
            let inner = self.inner.borrow();
            (inner.page.clone(), inner.policy, inner.media, inner.overlay.wrapper)
        };
        let parent = {
            let mut dom = page.dom_mut();
            let point = resolve_mount(&dom, policy, media).ok_or(DomError::NoParent(media))?;
            let parent = point.parent(&dom).ok_or(DomError::NoParent(point.target))?;
            ensure_positioning_context(&mut dom, parent)?;
            match point.placement {
                Placement::Prepend => dom.prepend_child(point.target, wrapper)?,
                Placement::Append => dom.append_child(point.target, wrapper)?,
                Placement::Before => dom.insert_before(point.target, wrapper)?,
                Placement::After => dom.insert_after(point.target, wrapper)?,
            }
            parent
        };
        tracing::trace!("Overlay for {} mounted under {}", media, parent);
        self.setup_resize_observer(parent);
        Ok(())
    }

    /// Check the overlay's mount and fix what the page broke
    pub fn verify_and_repair(&self) -> Option<Repair> {
        let (page, policy, media, wrapper) = {
            let inner = self.inner.borrow();
            if inner.state != ControllerState::Active {
                return None;
            }
            (inner.page.clone(), inner.policy, inner.media, inner.overlay.wrapper)
        };

        let finding = {
            let dom = page.dom();
            if !dom.is_connected(media) {
                return None;
            }
            let expected = resolve_mount(&dom, policy, media).and_then(|point| point.parent(&dom))?;
            if !dom.is_connected(wrapper) || dom.parent(wrapper) != Some(expected) {
                Finding::Misplaced
            } else if dom.is_element(expected) && dom.offset_parent(wrapper) != Some(expected) {
                Finding::Unpositioned(expected)
            } else {
                return None;
            }
        };

        match finding {
            Finding::Misplaced => match self.mount() {
                Ok(()) => {
                    tracing::debug!("Overlay for {} remounted", media);
                    self.clamp_position();
                    Some(Repair::Remounted)
                }
                Err(e) => {
                    tracing::warn!("Remounting overlay for {} failed: {}", media, e);
                    None
                }
            },
            Finding::Unpositioned(parent) => match ensure_positioning_context(&mut page.dom_mut(), parent) {
                Ok(true) => {
                    tracing::debug!("Positioning context of {} restored", parent);
                    Some(Repair::PositioningRestored)
                }
                Ok(false) => None,
                Err(e) => {
                    tracing::warn!("Restoring positioning of {} failed: {}", parent, e);
                    None
                }
            },
        }
    }

    /// Watch the mount parent's size, replacing any previous observer
    fn setup_resize_observer(&self, parent: NodeId) {
        let (page, id) = {
            let mut inner = self.inner.borrow_mut();
            let page = inner.page.clone();
            if let Some(observer) = inner.resize_observer.take() {
                page.disconnect_resize_observer(observer);
            }
            if let Some(timer) = inner.resize_debounce.take() {
                page.clear_timer(timer);
            }
            (page, inner.id.clone())
        };
        let weak = self.downgrade();
        let observer = page.create_resize_observer(move |_| {
            if let Some(ctl) = Controller::upgrade(&weak) {
                ctl.on_parent_resized();
            }
        });
        let Some(observer) = observer else {
            tracing::debug!("No resize observer; overlay {} is clamped on drag only", id);
            return;
        };
        page.observe_resize(observer, parent);
        self.inner.borrow_mut().resize_observer = Some(observer);
    }

    fn on_parent_resized(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state != ControllerState::Active {
            return;
        }
        let page = inner.page.clone();
        if let Some(timer) = inner.resize_debounce.take() {
            page.clear_timer(timer);
        }
        let weak = self.downgrade();
        inner.resize_debounce = Some(page.set_timeout(timing::RESIZE_DEBOUNCE_MS, move || {
            if let Some(ctl) = Controller::upgrade(&weak) {
                {
                    let mut inner = ctl.inner.borrow_mut();
                    inner.resize_debounce = None;
                    inner.drag_position_initialized = false;
                }
                ctl.clamp_position();
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{controller, page_with_video};
    use super::*;
    use fos_dom::{DOMRect, ShadowRootMode};
    use fos_page::{Capabilities, Page, PageOptions};

    #[test]
    fn test_detached_overlay_is_remounted() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        let wrapper = ctl.overlay().wrapper;
        page.dom_mut().remove(wrapper).unwrap();

        assert_eq!(ctl.verify_and_repair(), Some(Repair::Remounted));
        assert_eq!(page.dom().parent(wrapper), Some(container));
        assert_eq!(ctl.verify_and_repair(), None);
    }

    #[test]
    fn test_periodic_check_remounts_moved_overlay() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        let wrapper = ctl.overlay().wrapper;
        let body = page.dom().body();
        page.dom_mut().append_child(body, wrapper).unwrap();

        page.advance(timing::POSITION_CHECK_MS);
        assert_eq!(page.dom().parent(wrapper), Some(container));
        assert_eq!(page.dom().children(container)[0], wrapper);
    }

    #[test]
    fn test_lost_positioning_is_restored() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        page.dom_mut().set_style(container, "position", "static").unwrap();

        assert_eq!(ctl.verify_and_repair(), Some(Repair::PositioningRestored));
        let dom = page.dom();
        assert_eq!(dom.style(container).and_then(|s| s.get("position")), Some("relative"));
        assert_eq!(dom.offset_parent(ctl.overlay().wrapper), Some(container));
    }

    #[test]
    fn test_transformed_parent_left_alone() {
        let page = Page::new("https://example.com/");
        let body = page.dom().body();
        let (wrap, video) = {
            let mut dom = page.dom_mut();
            let wrap = dom.create_element("div");
            dom.add_class(wrap, "video-container").unwrap();
            dom.set_style(wrap, "transform", "translate(0px, 0px)").unwrap();
            dom.append_child(body, wrap).unwrap();
            let video = dom.create_element("video");
            dom.append_child(wrap, video).unwrap();
            (wrap, video)
        };
        let ctl = controller(&page, video);
        let dom = page.dom();
        assert_eq!(dom.style(wrap).and_then(|s| s.get("position")), None);
        assert_eq!(dom.offset_parent(ctl.overlay().wrapper), Some(wrap));
    }

    #[test]
    fn test_mounts_inside_shadow_root() {
        let page = Page::new("https://example.com/");
        let body = page.dom().body();
        let (shadow, video) = {
            let mut dom = page.dom_mut();
            let host = dom.create_element("my-player");
            dom.append_child(body, host).unwrap();
            let shadow = dom.attach_shadow(host, ShadowRootMode::Open).unwrap();
            let video = dom.create_element("video");
            dom.append_child(shadow, video).unwrap();
            (shadow, video)
        };
        let ctl = controller(&page, video);
        assert_eq!(page.dom().parent(ctl.overlay().wrapper), Some(shadow));
        assert_eq!(ctl.verify_and_repair(), None);
    }

    #[test]
    fn test_resolve_mount_falls_back_to_parent() {
        let mut dom = DomTree::new();
        let body = dom.body();
        let wrap = dom.create_element("div");
        dom.append_child(body, wrap).unwrap();
        let video = dom.create_element("video");
        dom.append_child(wrap, video).unwrap();
        assert_eq!(SitePolicy::Generic.mount_point(&dom, video), None);
        assert_eq!(resolve_mount(&dom, SitePolicy::Generic, video), Some(MountPoint::prepend(wrap)));

        dom.remove(video).unwrap();
        assert_eq!(resolve_mount(&dom, SitePolicy::Generic, video), None);
    }

    #[test]
    fn test_without_resize_observer() {
        let page = Page::with_options(PageOptions {
            capabilities: Capabilities { resize_observer: false, ..Capabilities::default() },
            ..PageOptions::new("https://example.com/")
        });
        let body = page.dom().body();
        let video = {
            let mut dom = page.dom_mut();
            let wrap = dom.create_element("div");
            dom.add_class(wrap, "player-wrapper").unwrap();
            dom.append_child(body, wrap).unwrap();
            dom.set_layout_rect(wrap, DOMRect::from_xywh(0.0, 0.0, 400.0, 300.0)).unwrap();
            let video = dom.create_element("video");
            dom.append_child(wrap, video).unwrap();
            video
        };
        let ctl = controller(&page, video);
        assert_eq!(page.resize_observer_count(), 0);
        assert!(ctl.is_connected());
        ctl.set_speed(2.0).unwrap();
        page.advance(100.0);
        assert_eq!(ctl.speed(), 2.0);
    }

    #[test]
    fn test_resize_debounce_is_last_wins() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        page.advance(timing::RESIZE_DEBOUNCE_MS * 2.0);
        let timers = page.timer_count();
        for width in [500.0, 400.0, 300.0] {
            page.dom_mut()
                .set_layout_rect(container, DOMRect::from_xywh(0.0, 0.0, width, 200.0))
                .unwrap();
            page.advance(20.0);
        }
        // one pending debounce at most
        assert!(page.timer_count() <= timers + 1);
        page.advance(timing::RESIZE_DEBOUNCE_MS);
        assert!(ctl.bounds().unwrap().contains(ctl.position().0, ctl.position().1));
    }
}
