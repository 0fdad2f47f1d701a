//! Runtime tests for fos-page
//!
//! Event dispatch order, the virtual clock and observer delivery.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{DOMRect, MediaEventKind, MutationObserverInit, ShadowRootMode};
use fos_page::{Capabilities, Event, EventTarget, EventType, ListenerOptions, Page, PageOptions};

fn log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_capture_then_target_then_bubble() {
    let page = Page::new("https://example.com/");
    let body = page.dom().body();
    let div = page.dom_mut().create_element("div");
    page.dom_mut().append_child(body, div).unwrap();

    let seen = log();
    for (target, capture, tag) in [
        (EventTarget::Window, true, "window-capture"),
        (EventTarget::Node(div), false, "div-bubble"),
        (EventTarget::Node(div), true, "div-capture"),
        (EventTarget::Window, false, "window-bubble"),
    ] {
        let seen = seen.clone();
        let options = if capture { ListenerOptions::capture() } else { ListenerOptions::default() };
        page.add_event_listener(target, EventType::Click, options, move |_| {
            seen.borrow_mut().push(tag.to_string());
        });
    }

    page.dispatch_event(div, Event::new(EventType::Click));
    assert_eq!(
        *seen.borrow(),
        vec!["window-capture", "div-capture", "div-bubble", "window-bubble"]
    );
}

#[test]
fn test_stop_immediate_propagation_at_target() {
    let page = Page::new("https://example.com/");
    let video = page.dom_mut().create_element("video");
    let body = page.dom().body();
    page.dom_mut().append_child(body, video).unwrap();

    let seen = log();
    page.add_event_listener(video, EventType::Media(MediaEventKind::RateChange), ListenerOptions::capture(), |e| {
        e.stop_immediate_propagation();
    });
    let sink = seen.clone();
    page.add_event_listener(video, EventType::Media(MediaEventKind::RateChange), ListenerOptions::default(), move |_| {
        sink.borrow_mut().push("page".into());
    });

    page.dom_mut().set_playback_rate(video, 2.0).unwrap();
    page.flush();
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_events_cross_shadow_boundary() {
    let page = Page::new("https://example.com/");
    let body = page.dom().body();
    let host = page.dom_mut().create_element("div");
    page.dom_mut().append_child(body, host).unwrap();
    let shadow = page.dom_mut().attach_shadow(host, ShadowRootMode::Closed).unwrap();
    let button = page.dom_mut().create_element("button");
    page.dom_mut().append_child(shadow, button).unwrap();

    let seen = log();
    let sink = seen.clone();
    let root = page.dom().root();
    page.add_event_listener(root, EventType::PointerDown, ListenerOptions::default(), move |e| {
        sink.borrow_mut().push(format!("{:?}", e.target_node().is_some()));
    });
    page.dispatch_event(button, Event::pointer(EventType::PointerDown, 1.0, 1.0));
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_once_listener() {
    let page = Page::new("https://example.com/");
    let hits = Rc::new(RefCell::new(0));
    let counter = hits.clone();
    page.add_event_listener(EventTarget::Window, EventType::Blur, ListenerOptions::once(), move |_| {
        *counter.borrow_mut() += 1;
    });
    page.dispatch_event(EventTarget::Window, Event::new(EventType::Blur));
    page.dispatch_event(EventTarget::Window, Event::new(EventType::Blur));
    assert_eq!(*hits.borrow(), 1);
    assert_eq!(page.listener_count(), 0);
}

// ============================================================================
// Event loop
// ============================================================================

#[test]
fn test_timers_follow_virtual_clock() {
    let page = Page::new("https://example.com/");
    let seen = log();
    let sink = seen.clone();
    page.set_timeout(50.0, move || sink.borrow_mut().push("timeout".into()));
    let sink = seen.clone();
    let interval = page.set_interval(20.0, move || sink.borrow_mut().push("tick".into()));

    page.advance(45.0);
    assert_eq!(*seen.borrow(), vec!["tick", "tick"]);
    page.advance(20.0);
    assert_eq!(seen.borrow().iter().filter(|s| *s == "timeout").count(), 1);

    page.clear_timer(interval);
    assert_eq!(page.timer_count(), 0);
    assert_eq!(page.now(), 65.0);
}

#[test]
fn test_animation_frame_and_idle() {
    let page = Page::new("https://example.com/");
    let seen = log();
    let sink = seen.clone();
    page.request_idle_callback(Some(100.0), move || sink.borrow_mut().push("idle".into()));
    let sink = seen.clone();
    page.request_animation_frame(move |_| sink.borrow_mut().push("frame".into()));
    page.advance(20.0);
    assert_eq!(*seen.borrow(), vec!["frame", "idle"]);
}

#[test]
fn test_busy_page_runs_idle_on_timeout() {
    let page = Page::new("https://example.com/");
    page.set_busy(true);
    let seen = log();
    let sink = seen.clone();
    page.request_idle_callback(Some(100.0), move || sink.borrow_mut().push("idle".into()));
    page.advance(99.0);
    assert!(seen.borrow().is_empty());
    page.advance(1.0);
    assert_eq!(seen.borrow().len(), 1);
}

// ============================================================================
// Observers
// ============================================================================

#[test]
fn test_mutation_records_delivered_after_task() {
    let page = Page::new("https://example.com/");
    let seen = Rc::new(RefCell::new(0usize));
    let sink = seen.clone();
    let observer = page.create_mutation_observer(move |records| {
        *sink.borrow_mut() += records.len();
    });
    let root = page.dom().root();
    page.observe_mutations(observer, root, MutationObserverInit::subtree());

    let body = page.dom().body();
    let a = page.dom_mut().create_element("div");
    let b = page.dom_mut().create_element("div");
    page.dom_mut().append_child(body, a).unwrap();
    page.dom_mut().append_child(a, b).unwrap();
    assert_eq!(*seen.borrow(), 0);
    page.flush();
    assert_eq!(*seen.borrow(), 2);

    page.disconnect_mutation_observer(observer);
    assert_eq!(page.mutation_observer_count(), 0);
}

#[test]
fn test_resize_observer_reports_changes() {
    let page = Page::new("https://example.com/");
    let body = page.dom().body();
    let div = page.dom_mut().create_element("div");
    page.dom_mut().append_child(body, div).unwrap();
    page.dom_mut().set_layout_rect(div, DOMRect::from_xywh(0.0, 0.0, 100.0, 100.0)).unwrap();

    let sizes = Rc::new(RefCell::new(Vec::new()));
    let sink = sizes.clone();
    let observer = page
        .create_resize_observer(move |entries| {
            sink.borrow_mut().extend(entries.iter().map(|e| e.width));
        })
        .unwrap();
    page.observe_resize(observer, div);

    page.advance(20.0);
    page.advance(20.0);
    page.dom_mut().set_layout_rect(div, DOMRect::from_xywh(0.0, 0.0, 200.0, 100.0)).unwrap();
    page.advance(20.0);
    assert_eq!(*sizes.borrow(), vec![100.0, 200.0]);
}

#[test]
fn test_resize_observer_capability() {
    let mut options = PageOptions::new("https://example.com/");
    options.capabilities = Capabilities { resize_observer: false, ..Capabilities::default() };
    let page = Page::with_options(options);
    assert!(page.create_resize_observer(|_| {}).is_none());
}

#[test]
fn test_hostname() {
    let page = Page::new("https://WWW.YouTube.com/watch?v=1");
    assert_eq!(page.hostname(), "www.youtube.com");
    assert!(page.is_top_frame());
    assert_eq!(Page::new("not a url").hostname(), "");
}
