//! Dragging and boundary clamping

use fos_dom::{DOMRect, DomTree, NodeId};
use fos_page::{Event, EventTarget, EventType, ListenerId, ListenerOptions};

use super::{Controller, ControllerState, warn_on_err};
use crate::constants::controller::BOUNDARY_PADDING;

/// An in-progress drag
pub(super) struct DragState {
    /// Pointer position relative to the overlay's top-left corner
    offset: (f64, f64),
    pub(super) listeners: Vec<ListenerId>,
}

/// Allowed overlay offsets inside the mount parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.max(self.min_x).min(self.max_x), y.max(self.min_y).min(self.max_y))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

/// Parent box, shrunk to the media box when that is smaller, minus padding
/// and the overlay's own size
pub(super) fn clamp_bounds(dom: &DomTree, viewport: DOMRect, wrapper: NodeId, media: NodeId) -> Option<Bounds> {
    let parent = dom.parent(wrapper)?;
    let parent_rect = dom.bounding_client_rect(parent);
    let mut width = if parent_rect.width > 0.0 { parent_rect.width } else { viewport.width };
    let mut height = if parent_rect.height > 0.0 { parent_rect.height } else { viewport.height };

    let media_rect = dom.bounding_client_rect(media);
    if media_rect.width > 0.0 && media_rect.height > 0.0 {
        width = width.min(media_rect.width);
        height = height.min(media_rect.height);
    }
    if width == 0.0 || height == 0.0 {
        return None;
    }

    let overlay = dom.bounding_client_rect(wrapper);
    Some(Bounds {
        min_x: BOUNDARY_PADDING,
        max_x: BOUNDARY_PADDING.max(width - overlay.width - BOUNDARY_PADDING),
        min_y: BOUNDARY_PADDING,
        max_y: BOUNDARY_PADDING.max(height - overlay.height - BOUNDARY_PADDING),
    })
}

impl Controller {
    /// Current clamping bounds, if the overlay is mounted
    pub fn bounds(&self) -> Option<Bounds> {
        let inner = self.inner.borrow();
        let dom = inner.page.dom();
        clamp_bounds(&dom, inner.page.viewport(), inner.overlay.wrapper, inner.media)
    }

    /// Pull the overlay back inside its bounds unless a drag is running
    pub fn clamp_position(&self) {
        let Some(bounds) = self.bounds() else {
            return;
        };
        let mut inner = self.inner.borrow_mut();
        if inner.state != ControllerState::Active || inner.drag.is_some() {
            return;
        }
        let (x, y) = inner.position;
        let clamped = bounds.clamp(x, y);
        if clamped != (x, y) {
            inner.position = clamped;
            let mut dom = inner.page.dom_mut();
            warn_on_err("Clamping overlay", inner.overlay.set_position(&mut dom, clamped.0, clamped.1));
        }
    }

    pub(super) fn on_drag_start(&self, event: &mut Event) {
        let (page, media, wrapper, panel) = {
            let inner = self.inner.borrow();
            if inner.state != ControllerState::Active {
                return;
            }
            (inner.page.clone(), inner.media, inner.overlay.wrapper, inner.overlay.panel)
        };
        let connected = page.dom().is_connected(media);
        if !connected {
            tracing::debug!("Media {} gone at drag start", media);
            self.destroy();
            return;
        }
        if self.is_dragging() {
            return;
        }
        let Some(pointer) = event.pointer else {
            return;
        };
        event.prevent_default();
        event.stop_propagation();

        let (rect, parent_rect) = {
            let dom = page.dom();
            let parent_rect = dom.parent(wrapper).map(|p| dom.bounding_client_rect(p));
            (dom.bounding_client_rect(wrapper), parent_rect)
        };
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.drag_position_initialized {
                if let Some(parent_rect) = parent_rect {
                    inner.position = (rect.left() - parent_rect.left(), rect.top() - parent_rect.top());
                    inner.drag_position_initialized = true;
                }
            }
        }
        warn_on_err("Marking drag", page.dom_mut().add_class(panel, "dragging"));

        let document = EventTarget::Node(NodeId::ROOT);
        let (move_type, end_types): (EventType, &[EventType]) = if event.event_type == EventType::PointerDown {
            (EventType::PointerMove, &[EventType::PointerUp, EventType::PointerCancel])
        } else {
            (EventType::MouseMove, &[EventType::MouseUp])
        };
        let mut listeners = vec![self.listen(document, move_type, ListenerOptions::default(), |ctl, event| {
            ctl.on_drag_move(event)
        })];
        for &end in end_types {
            listeners.push(self.listen(document, end, ListenerOptions::default(), |ctl, _| ctl.end_drag()));
        }
        listeners.push(self.listen(EventTarget::Window, EventType::Blur, ListenerOptions::default(), |ctl, _| {
            ctl.end_drag()
        }));

        self.inner.borrow_mut().drag = Some(DragState {
            offset: (pointer.client_x - rect.left(), pointer.client_y - rect.top()),
            listeners,
        });
    }

    fn on_drag_move(&self, event: &mut Event) {
        let Some(pointer) = event.pointer else {
            return;
        };
        let (page, media, wrapper, offset) = {
            let inner = self.inner.borrow();
            let Some(drag) = inner.drag.as_ref() else {
                return;
            };
            (inner.page.clone(), inner.media, inner.overlay.wrapper, drag.offset)
        };
        if !page.dom().is_connected(media) {
            self.end_drag();
            return;
        }
        event.prevent_default();

        let (parent_rect, bounds) = {
            let dom = page.dom();
            let Some(parent) = dom.parent(wrapper) else {
                return;
            };
            (dom.bounding_client_rect(parent), clamp_bounds(&dom, page.viewport(), wrapper, media))
        };
        let Some(bounds) = bounds else {
            return;
        };
        let position = bounds.clamp(
            pointer.client_x - parent_rect.left() - offset.0,
            pointer.client_y - parent_rect.top() - offset.1,
        );

        let mut inner = self.inner.borrow_mut();
        inner.position = position;
        let mut dom = page.dom_mut();
        warn_on_err("Moving overlay", inner.overlay.set_position(&mut dom, position.0, position.1));
    }

    /// Finish a drag and drop its document listeners
    pub(super) fn end_drag(&self) {
        let (page, panel, drag) = {
            let mut inner = self.inner.borrow_mut();
            (inner.page.clone(), inner.overlay.panel, inner.drag.take())
        };
        let Some(drag) = drag else {
            return;
        };
        for id in drag.listeners {
            page.remove_event_listener(id);
        }
        if page.dom().contains(panel) {
            warn_on_err("Ending drag", page.dom_mut().remove_class(panel, "dragging"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{controller, page_with_video};
    use super::*;
    use crate::constants::timing;
    use fos_page::{Capabilities, Page, PageOptions};

    #[test]
    fn test_bounds_use_smaller_media_box() {
        let (page, container, video) = page_with_video();
        page.dom_mut()
            .set_layout_rect(container, DOMRect::from_xywh(0.0, 0.0, 800.0, 600.0))
            .unwrap();
        let ctl = controller(&page, video);
        let (w, h) = super::super::collapsed_size(14.0);
        let bounds = ctl.bounds().unwrap();
        assert_eq!(bounds.min_x, BOUNDARY_PADDING);
        assert_eq!(bounds.max_x, 640.0 - w - BOUNDARY_PADDING);
        assert_eq!(bounds.max_y, 360.0 - h - BOUNDARY_PADDING);
    }

    #[test]
    fn test_drag_is_clamped() {
        let (page, _, video) = page_with_video();
        let ctl = controller(&page, video);
        let display = ctl.overlay().speed_display;
        let root = page.dom().root();

        page.dispatch_event(display, Event::pointer(EventType::PointerDown, 15.0, 15.0));
        assert!(ctl.is_dragging());
        assert!(page.dom().has_class(ctl.overlay().panel, "dragging"));

        for (x, y) in [(5_000.0, 5_000.0), (-300.0, 40.0), (200.0, -999.0), (100.0, 100.0)] {
            page.dispatch_event(root, Event::pointer(EventType::PointerMove, x, y));
            let bounds = ctl.bounds().unwrap();
            let (px, py) = ctl.position();
            assert!(bounds.contains(px, py), "({px}, {py}) outside {bounds:?}");
        }
        assert_eq!(ctl.position(), (95.0, 95.0));

        let listeners = page.listener_count();
        page.dispatch_event(root, Event::pointer(EventType::PointerUp, 100.0, 100.0));
        assert!(!ctl.is_dragging());
        assert_eq!(page.listener_count(), listeners - 4);
        let transform = page.dom().style(ctl.overlay().wrapper).and_then(|s| s.get("transform").map(str::to_string));
        assert_eq!(transform.as_deref(), Some("translate(95px, 95px)"));
    }

    #[test]
    fn test_mouse_drag_without_pointer_events() {
        let page = Page::with_options(PageOptions {
            capabilities: Capabilities { pointer_events: false, ..Capabilities::default() },
            ..PageOptions::new("https://example.com/")
        });
        let body = page.dom().body();
        let video = {
            let mut dom = page.dom_mut();
            let wrap = dom.create_element("div");
            dom.append_child(body, wrap).unwrap();
            dom.set_layout_rect(wrap, DOMRect::from_xywh(0.0, 0.0, 400.0, 300.0)).unwrap();
            let video = dom.create_element("video");
            dom.append_child(wrap, video).unwrap();
            video
        };
        let ctl = controller(&page, video);
        let display = ctl.overlay().speed_display;
        page.dispatch_event(display, Event::pointer(EventType::PointerDown, 12.0, 12.0));
        assert!(!ctl.is_dragging());
        page.dispatch_event(display, Event::pointer(EventType::MouseDown, 12.0, 12.0));
        assert!(ctl.is_dragging());
        page.dispatch_event(EventTarget::Window, Event::new(EventType::Blur));
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn test_drag_start_on_detached_media_destroys() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        let display = ctl.overlay().speed_display;
        page.dom_mut().remove(video).unwrap();
        page.dispatch_event(display, Event::pointer(EventType::PointerDown, 15.0, 15.0));
        assert!(!ctl.is_active());
        assert!(page.dom().children(container).is_empty());
    }

    #[test]
    fn test_parent_shrink_reclamps() {
        let (page, container, video) = page_with_video();
        let ctl = controller(&page, video);
        let root = page.dom().root();
        page.dispatch_event(ctl.overlay().speed_display, Event::pointer(EventType::PointerDown, 15.0, 15.0));
        page.dispatch_event(root, Event::pointer(EventType::PointerMove, 600.0, 300.0));
        page.dispatch_event(root, Event::pointer(EventType::PointerUp, 600.0, 300.0));
        page.advance(100.0);
        let before = ctl.position();

        {
            let mut dom = page.dom_mut();
            dom.set_layout_rect(container, DOMRect::from_xywh(0.0, 0.0, 320.0, 180.0)).unwrap();
            dom.set_layout_rect(video, DOMRect::from_xywh(0.0, 0.0, 320.0, 180.0)).unwrap();
        }
        page.advance(timing::RESIZE_DEBOUNCE_MS + 20.0);
        let after = ctl.position();
        assert!(after.0 < before.0 && after.1 < before.1);
        assert!(ctl.bounds().unwrap().contains(after.0, after.1));
    }
}
