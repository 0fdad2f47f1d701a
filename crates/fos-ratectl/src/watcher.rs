//! Change Observer
//!
//! Watches the document and every discovered shadow root through a single
//! page mutation observer. Records are batched and processed in one flush
//! scheduled on an idle callback (or a short timer when the page has no
//! idle callbacks), so a burst of DOM churn costs a single deep scan.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use fos_dom::{MutationObserverInit, MutationRecord, NodeId, ObserverId};
use fos_page::{Capabilities, IdleId, Page, TimerId};

use crate::constants::observer;
use crate::scanner::{collect_media, is_target_media};
use crate::shadow_access::ShadowAccess;

/// Receiver of discovery events
pub trait MediaSink {
    /// Whether the element already has a controller or a pending deferral
    fn is_known(&self, media: NodeId) -> bool;
    fn media_found(&self, media: NodeId);
    fn media_removed(&self, media: NodeId);
}

/// How a batched flush is scheduled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlushStrategy {
    Idle { timeout_ms: f64 },
    Timer { delay_ms: f64 },
}

impl FlushStrategy {
    pub fn resolve(caps: &Capabilities) -> Self {
        if caps.idle_callback {
            FlushStrategy::Idle { timeout_ms: observer::IDLE_TIMEOUT_MS }
        } else {
            FlushStrategy::Timer { delay_ms: observer::DEBOUNCE_MS }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScheduledFlush {
    Idle(IdleId),
    Timer(TimerId),
}

struct WatcherState {
    page: Page,
    observer: ObserverId,
    observed: HashSet<NodeId>,
    pending: Vec<MutationRecord>,
    scheduled: Option<ScheduledFlush>,
    include_audio: bool,
    access: ShadowAccess,
    strategy: FlushStrategy,
    sink: Weak<dyn MediaSink>,
    stopped: bool,
}

/// Batched media discovery over mutation records
pub struct MediaWatcher {
    state: Rc<RefCell<WatcherState>>,
}

impl MediaWatcher {
    pub fn new(page: &Page, sink: Weak<dyn MediaSink>, include_audio: bool, access: ShadowAccess) -> Self {
        let strategy = FlushStrategy::resolve(&page.capabilities());
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<WatcherState>>| {
            let weak = weak.clone();
            let observer = page.create_mutation_observer(move |records| enqueue(&weak, records));
            RefCell::new(WatcherState {
                page: page.clone(),
                observer,
                observed: HashSet::new(),
                pending: Vec::new(),
                scheduled: None,
                include_audio,
                access,
                strategy,
                sink,
                stopped: false,
            })
        });
        tracing::debug!("Media watcher created ({:?})", strategy);
        Self { state }
    }

    /// Subscribe to `root` and every readable shadow root below it
    pub fn observe_tree(&self, root: NodeId) {
        let (page, access) = {
            let state = self.state.borrow();
            if state.stopped {
                return;
            }
            (state.page.clone(), state.access)
        };
        let shadows = {
            let dom = page.dom();
            collect_media(&dom, root, access, 0, &mut |_| {})
        };
        let mut state = self.state.borrow_mut();
        subscribe(&mut state, root);
        for shadow in shadows {
            subscribe(&mut state, shadow);
        }
    }

    pub fn set_include_audio(&self, include_audio: bool) {
        self.state.borrow_mut().include_audio = include_audio;
    }

    /// Roots currently subscribed
    pub fn observed_count(&self) -> usize {
        self.state.borrow().observed.len()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.state.borrow().scheduled.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    /// Cancel the pending flush, drop queued records and disconnect. Nothing
    /// is emitted afterwards.
    pub fn stop(&self) {
        let mut state = self.state.borrow_mut();
        if state.stopped {
            return;
        }
        state.stopped = true;
        state.pending.clear();
        state.observed.clear();
        match state.scheduled.take() {
            Some(ScheduledFlush::Idle(id)) => state.page.cancel_idle_callback(id),
            Some(ScheduledFlush::Timer(id)) => state.page.clear_timer(id),
            None => {}
        }
        state.page.disconnect_mutation_observer(state.observer);
        tracing::debug!("Media watcher stopped");
    }
}

impl Drop for MediaWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn subscribe(state: &mut WatcherState, root: NodeId) {
    if state.observed.insert(root) {
        state
            .page
            .observe_mutations(state.observer, root, MutationObserverInit::subtree());
    }
}

fn enqueue(weak: &Weak<RefCell<WatcherState>>, records: Vec<MutationRecord>) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let mut state = state.borrow_mut();
    if state.stopped {
        return;
    }
    state.pending.extend(records);
    if state.scheduled.is_some() {
        return;
    }
    let weak = weak.clone();
    let scheduled = match state.strategy {
        FlushStrategy::Idle { timeout_ms } => {
            ScheduledFlush::Idle(state.page.request_idle_callback(Some(timeout_ms), move || flush(&weak)))
        }
        FlushStrategy::Timer { delay_ms } => {
            ScheduledFlush::Timer(state.page.set_timeout(delay_ms, move || flush(&weak)))
        }
    };
    state.scheduled = Some(scheduled);
}

fn flush(weak: &Weak<RefCell<WatcherState>>) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let (records, page, include_audio, access, sink) = {
        let mut s = state.borrow_mut();
        s.scheduled = None;
        if s.stopped {
            return;
        }
        (
            std::mem::take(&mut s.pending),
            s.page.clone(),
            s.include_audio,
            s.access,
            s.sink.clone(),
        )
    };
    let Some(sink) = sink.upgrade() else {
        return;
    };

    let mut removed = Vec::new();
    let mut found = Vec::new();
    let mut shadows = Vec::new();
    {
        let dom = page.dom();
        let mut seen_removed = HashSet::new();
        let mut seen_found = HashSet::new();
        for record in &records {
            for &node in &record.removed_nodes {
                if !dom.is_element(node) {
                    continue;
                }
                collect_media(&dom, node, access, 0, &mut |media| {
                    if sink.is_known(media) && seen_removed.insert(media) {
                        removed.push(media);
                    }
                });
            }
            for &node in &record.added_nodes {
                if !dom.is_element(node) {
                    continue;
                }
                let entered = collect_media(&dom, node, access, 0, &mut |media| {
                    if is_target_media(&dom, media, include_audio) && seen_found.insert(media) {
                        found.push(media);
                    }
                });
                shadows.extend(entered);
            }
        }
        shadows.retain(|&shadow| dom.is_connected(shadow));
        state.borrow_mut().observed.retain(|&root| dom.contains(root));
    }
    {
        let mut s = state.borrow_mut();
        for shadow in shadows {
            subscribe(&mut s, shadow);
        }
    }

    if !removed.is_empty() || !found.is_empty() {
        tracing::debug!(
            "Watcher flush: {} records, {} removed, {} found",
            records.len(),
            removed.len(),
            found.len()
        );
    }

    for media in removed {
        if state.borrow().stopped {
            return;
        }
        sink.media_removed(media);
    }
    for media in found {
        if state.borrow().stopped {
            return;
        }
        let connected = page.dom().is_connected(media);
        if connected && !sink.is_known(media) {
            sink.media_found(media);
        }
    }
}
