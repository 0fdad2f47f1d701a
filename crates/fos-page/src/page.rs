//! Page runtime
//!
//! One document plus its event loop. Everything is single-threaded:
//! callbacks are cloned out of their registries before they run, so a
//! callback may freely touch the DOM, listeners and timers.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use fos_dom::{DOMRect, DomTree, MutationObserverInit, MutationRecord, NodeId, ObserverId};

use crate::event::{Event, EventTarget, EventType, ListenerOptions};
use crate::event_loop::{FrameId, IdleId, NextWork, Ready, Scheduler, TimerId};
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::observers::{MutationCallbacks, ResizeObserverEntry, ResizeObserverId, ResizeObservers};

/// Host features a client may check for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `requestIdleCallback`
    pub idle_callback: bool,
    /// Pointer events (otherwise only mouse events)
    pub pointer_events: bool,
    /// `ResizeObserver`
    pub resize_observer: bool,
    /// Access to closed shadow roots
    pub privileged_shadow_access: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            idle_callback: true,
            pointer_events: true,
            resize_observer: true,
            privileged_shadow_access: true,
        }
    }
}

/// Page construction options
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub url: String,
    pub top_frame: bool,
    pub capabilities: Capabilities,
    /// Viewport size in CSS pixels
    pub viewport: (f64, f64),
}

impl PageOptions {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            top_frame: true,
            capabilities: Capabilities::default(),
            viewport: (1280.0, 720.0),
        }
    }
}

struct PageInner {
    url: String,
    hostname: String,
    top_frame: bool,
    capabilities: Capabilities,
    viewport: (f64, f64),
    busy: Cell<bool>,
    dom: RefCell<DomTree>,
    scheduler: RefCell<Scheduler>,
    listeners: RefCell<ListenerRegistry>,
    mutation_callbacks: RefCell<MutationCallbacks>,
    resize_observers: RefCell<ResizeObservers>,
}

/// Shared handle to a page
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.inner.url)
            .field("now", &self.now())
            .finish()
    }
}

impl Page {
    /// Top-level page with default capabilities
    pub fn new(url: &str) -> Self {
        Self::with_options(PageOptions::new(url))
    }

    pub fn with_options(options: PageOptions) -> Self {
        let hostname = match url::Url::parse(&options.url) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_ascii_lowercase(),
            Err(e) => {
                tracing::warn!("Invalid page URL {}: {}", options.url, e);
                String::new()
            }
        };
        Self {
            inner: Rc::new(PageInner {
                url: options.url,
                hostname,
                top_frame: options.top_frame,
                capabilities: options.capabilities,
                viewport: options.viewport,
                busy: Cell::new(false),
                dom: RefCell::new(DomTree::new()),
                scheduler: RefCell::new(Scheduler::default()),
                listeners: RefCell::new(ListenerRegistry::default()),
                mutation_callbacks: RefCell::new(MutationCallbacks::default()),
                resize_observers: RefCell::new(ResizeObservers::default()),
            }),
        }
    }

    // ---- page info ----

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Lowercase host of the page URL
    pub fn hostname(&self) -> &str {
        &self.inner.hostname
    }

    pub fn is_top_frame(&self) -> bool {
        self.inner.top_frame
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    pub fn viewport(&self) -> DOMRect {
        let (w, h) = self.inner.viewport;
        DOMRect::from_xywh(0.0, 0.0, w, h)
    }

    /// Whether two handles refer to the same page
    pub fn ptr_eq(&self, other: &Page) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ---- DOM ----

    /// Borrow the document; do not hold across callbacks
    pub fn dom(&self) -> Ref<'_, DomTree> {
        self.inner.dom.borrow()
    }

    /// Mutably borrow the document; do not hold across callbacks
    pub fn dom_mut(&self) -> RefMut<'_, DomTree> {
        self.inner.dom.borrow_mut()
    }

    // ---- clock and timers ----

    /// Current virtual time in milliseconds
    pub fn now(&self) -> f64 {
        self.inner.scheduler.borrow().now()
    }

    pub fn set_timeout(&self, delay_ms: f64, callback: impl FnOnce() + 'static) -> TimerId {
        self.inner.scheduler.borrow_mut().set_timeout(delay_ms, Box::new(callback))
    }

    pub fn set_interval(&self, period_ms: f64, callback: impl Fn() + 'static) -> TimerId {
        self.inner.scheduler.borrow_mut().set_interval(period_ms, Rc::new(callback))
    }

    /// Clear a timeout or interval
    pub fn clear_timer(&self, id: TimerId) {
        self.inner.scheduler.borrow_mut().clear_timer(id);
    }

    pub fn has_timer(&self, id: TimerId) -> bool {
        self.inner.scheduler.borrow().has_timer(id)
    }

    pub fn timer_count(&self) -> usize {
        self.inner.scheduler.borrow().timer_count()
    }

    pub fn request_animation_frame(&self, callback: impl FnOnce(f64) + 'static) -> FrameId {
        self.inner.scheduler.borrow_mut().request_frame(Box::new(callback))
    }

    pub fn cancel_animation_frame(&self, id: FrameId) {
        self.inner.scheduler.borrow_mut().cancel_frame(id);
    }

    /// Runs at the next idle frame, or once `timeout_ms` has passed
    pub fn request_idle_callback(&self, timeout_ms: Option<f64>, callback: impl FnOnce() + 'static) -> IdleId {
        self.inner.scheduler.borrow_mut().request_idle(timeout_ms, Box::new(callback))
    }

    pub fn cancel_idle_callback(&self, id: IdleId) {
        self.inner.scheduler.borrow_mut().cancel_idle(id);
    }

    /// A busy page has no idle periods; idle callbacks only run on timeout
    pub fn set_busy(&self, busy: bool) {
        self.inner.busy.set(busy);
    }

    // ---- listeners ----

    pub fn add_event_listener(
        &self,
        target: impl Into<EventTarget>,
        event_type: EventType,
        options: ListenerOptions,
        callback: impl Fn(&mut Event) + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .borrow_mut()
            .add(target.into(), event_type, options, Rc::new(callback))
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow().contains(id)
    }

    /// Total registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Composed path from the target up to the window
    fn event_path(&self, target: EventTarget) -> Vec<EventTarget> {
        let EventTarget::Node(node) = target else {
            return vec![EventTarget::Window];
        };
        let dom = self.dom();
        let mut path = vec![target];
        let mut current = dom.composed_parent(node);
        while let Some(ancestor) = current {
            path.push(EventTarget::Node(ancestor));
            current = dom.composed_parent(ancestor);
        }
        if dom.is_connected(node) {
            path.push(EventTarget::Window);
        }
        path
    }

    fn invoke(&self, event: &mut Event, target: EventTarget, capture: bool) {
        let listeners = self
            .inner
            .listeners
            .borrow()
            .matching(target, event.event_type, capture);
        for (id, once, callback) in listeners {
            if !self.has_listener(id) {
                continue;
            }
            if once {
                self.remove_event_listener(id);
            }
            event.set_current_target(Some(target));
            callback(event);
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    /// Dispatch synchronously through capture, target and bubble phases.
    ///
    /// At the target, capture listeners run before non-capture ones.
    pub fn dispatch_event(&self, target: impl Into<EventTarget>, mut event: Event) -> Event {
        let target = target.into();
        event.set_target(target);
        let path = self.event_path(target);

        for &ancestor in path.iter().skip(1).rev() {
            self.invoke(&mut event, ancestor, true);
            if event.propagation_stopped() {
                event.set_current_target(None);
                return event;
            }
        }

        self.invoke(&mut event, target, true);
        if !event.immediate_propagation_stopped() {
            self.invoke(&mut event, target, false);
        }

        if event.bubbles {
            for &ancestor in path.iter().skip(1) {
                if event.propagation_stopped() {
                    break;
                }
                self.invoke(&mut event, ancestor, false);
            }
        }

        event.set_current_target(None);
        event
    }

    /// Fire `pagehide` at the window
    pub fn fire_pagehide(&self) {
        self.dispatch_event(EventTarget::Window, Event::new(EventType::PageHide));
        self.flush();
    }

    // ---- observers ----

    pub fn create_mutation_observer(&self, callback: impl Fn(Vec<MutationRecord>) + 'static) -> ObserverId {
        let id = self.dom_mut().create_observer();
        self.inner.mutation_callbacks.borrow_mut().insert(id, Rc::new(callback));
        id
    }

    pub fn observe_mutations(&self, observer: ObserverId, target: NodeId, options: MutationObserverInit) {
        self.dom_mut().observe(observer, target, options);
    }

    /// Disconnect and forget an observer
    pub fn disconnect_mutation_observer(&self, observer: ObserverId) {
        let mut dom = self.dom_mut();
        dom.disconnect_observer(observer);
        dom.remove_observer(observer);
        drop(dom);
        self.inner.mutation_callbacks.borrow_mut().remove(observer);
    }

    pub fn mutation_observer_count(&self) -> usize {
        self.inner.mutation_callbacks.borrow().len()
    }

    /// `None` when the host lacks ResizeObserver
    pub fn create_resize_observer(
        &self,
        callback: impl Fn(Vec<ResizeObserverEntry>) + 'static,
    ) -> Option<ResizeObserverId> {
        if !self.inner.capabilities.resize_observer {
            return None;
        }
        Some(self.inner.resize_observers.borrow_mut().create(Rc::new(callback)))
    }

    pub fn observe_resize(&self, observer: ResizeObserverId, target: NodeId) {
        self.inner.resize_observers.borrow_mut().observe(observer, target);
    }

    pub fn disconnect_resize_observer(&self, observer: ResizeObserverId) {
        self.inner.resize_observers.borrow_mut().disconnect(observer);
    }

    pub fn resize_observer_count(&self) -> usize {
        self.inner.resize_observers.borrow().len()
    }

    // ---- event loop ----

    fn deliver_mutations(&self) -> bool {
        let pending = self.dom().pending_observers();
        if pending.is_empty() {
            return false;
        }
        for observer in pending {
            let records = self.dom_mut().take_records(observer);
            let callback = self.inner.mutation_callbacks.borrow().get(observer);
            if let Some(callback) = callback {
                if !records.is_empty() {
                    callback(records);
                }
            }
        }
        true
    }

    /// Run queued work at the current time: mutation observer delivery
    /// (after every task) and queued media events
    pub fn flush(&self) {
        loop {
            if self.deliver_mutations() {
                continue;
            }
            let next = self.dom_mut().pop_media_event();
            let Some((node, kind)) = next else {
                break;
            };
            self.dispatch_event(node, Event::media(kind));
        }
    }

    fn run_due_timers(&self) {
        loop {
            let ready = self.inner.scheduler.borrow_mut().pop_due_timer();
            match ready {
                Some(Ready::Once(callback)) => callback(),
                Some(Ready::Repeat(callback)) => callback(),
                None => break,
            }
            self.flush();
        }
    }

    fn run_idle(&self, idle_period: bool) {
        let callbacks = self.inner.scheduler.borrow_mut().take_idle(idle_period);
        for callback in callbacks {
            callback();
            self.flush();
        }
    }

    fn run_frame(&self) {
        let frames = self.inner.scheduler.borrow_mut().begin_frame();
        let now = self.now();
        for (_, callback) in frames {
            callback(now);
            self.flush();
        }

        let resized = {
            let dom = self.dom();
            self.inner.resize_observers.borrow_mut().check_sizes(&dom)
        };
        for (callback, entries) in resized {
            callback(entries);
            self.flush();
        }

        let busy = self.inner.busy.get();
        self.run_idle(!busy);
    }

    /// Advance the virtual clock, running everything that comes due
    pub fn advance(&self, ms: f64) {
        let end = self.now() + ms.max(0.0);
        self.flush();
        loop {
            let next = self.inner.scheduler.borrow().next_work();
            if next.at() > end {
                break;
            }
            self.inner.scheduler.borrow_mut().set_now(next.at());
            match next {
                NextWork::Timer(_) => self.run_due_timers(),
                NextWork::Frame(_) => self.run_frame(),
                NextWork::IdleDeadline(_) => self.run_idle(false),
            }
        }
        self.inner.scheduler.borrow_mut().set_now(end);
        self.flush();
    }
}
