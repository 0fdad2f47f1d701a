//! Event Loop
//!
//! Virtual clock with timers, animation frames and idle callbacks.
//! Time only moves when the embedder advances it.

use std::rc::Rc;

/// Frame interval in milliseconds
pub const FRAME_MS: f64 = 16.0;

/// setTimeout / setInterval handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// requestAnimationFrame handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

/// requestIdleCallback handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdleId(u64);

pub(crate) enum TimerCallback {
    Once(Box<dyn FnOnce()>),
    Repeat(Rc<dyn Fn()>),
}

struct Timer {
    id: TimerId,
    due: f64,
    order: u64,
    interval: Option<f64>,
    callback: TimerCallback,
}

struct Idle {
    id: IdleId,
    deadline: Option<f64>,
    callback: Box<dyn FnOnce()>,
}

/// A callback ready to run
pub(crate) enum Ready {
    Once(Box<dyn FnOnce()>),
    Repeat(Rc<dyn Fn()>),
}

/// What the loop should do next
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NextWork {
    Timer(f64),
    Frame(f64),
    IdleDeadline(f64),
}

impl NextWork {
    pub fn at(self) -> f64 {
        match self {
            NextWork::Timer(t) | NextWork::Frame(t) | NextWork::IdleDeadline(t) => t,
        }
    }
}

#[derive(Default)]
pub(crate) struct Scheduler {
    now: f64,
    last_frame: f64,
    timers: Vec<Timer>,
    frames: Vec<(FrameId, Box<dyn FnOnce(f64)>)>,
    idle: Vec<Idle>,
    next_id: u64,
    next_order: u64,
}

impl Scheduler {
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn set_now(&mut self, now: f64) {
        self.now = self.now.max(now);
    }

    fn next_raw_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_timer(&mut self, delay_ms: f64, interval: Option<f64>, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_raw_id());
        let order = self.next_order;
        self.next_order += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay_ms.max(0.0),
            order,
            interval,
            callback,
        });
        id
    }

    pub fn set_timeout(&mut self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerId {
        self.push_timer(delay_ms, None, TimerCallback::Once(callback))
    }

    pub fn set_interval(&mut self, period_ms: f64, callback: Rc<dyn Fn()>) -> TimerId {
        let period = period_ms.max(1.0);
        self.push_timer(period, Some(period), TimerCallback::Repeat(callback))
    }

    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn has_timer(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn request_frame(&mut self, callback: Box<dyn FnOnce(f64)>) -> FrameId {
        let id = FrameId(self.next_raw_id());
        self.frames.push((id, callback));
        id
    }

    pub fn cancel_frame(&mut self, id: FrameId) {
        self.frames.retain(|(f, _)| *f != id);
    }

    pub fn request_idle(&mut self, timeout_ms: Option<f64>, callback: Box<dyn FnOnce()>) -> IdleId {
        let id = IdleId(self.next_raw_id());
        let deadline = timeout_ms.map(|t| self.now + t);
        self.idle.push(Idle { id, deadline, callback });
        id
    }

    pub fn cancel_idle(&mut self, id: IdleId) -> bool {
        let before = self.idle.len();
        self.idle.retain(|i| i.id != id);
        before != self.idle.len()
    }

    /// Earliest pending work; timers win ties with frames
    pub fn next_work(&self) -> NextWork {
        let frame = NextWork::Frame(self.last_frame + FRAME_MS);
        let timer = self
            .timers
            .iter()
            .min_by(|a, b| a.due.total_cmp(&b.due).then(a.order.cmp(&b.order)))
            .map(|t| NextWork::Timer(t.due));
        let idle = self
            .idle
            .iter()
            .filter_map(|i| i.deadline)
            .min_by(f64::total_cmp)
            .map(NextWork::IdleDeadline);
        [timer, idle]
            .into_iter()
            .flatten()
            .fold(frame, |best, w| if w.at() <= best.at() { w } else { best })
    }

    /// Pop the earliest timer due at or before `now`, rescheduling intervals
    pub fn pop_due_timer(&mut self) -> Option<Ready> {
        let now = self.now;
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.order.cmp(&b.order)))
            .map(|(i, _)| i)?;

        match self.timers[index].interval {
            Some(period) => {
                let order = self.next_order;
                self.next_order += 1;
                let timer = &mut self.timers[index];
                timer.due += period;
                timer.order = order;
                match &timer.callback {
                    TimerCallback::Repeat(cb) => Some(Ready::Repeat(cb.clone())),
                    TimerCallback::Once(_) => None,
                }
            }
            None => match self.timers.remove(index).callback {
                TimerCallback::Once(cb) => Some(Ready::Once(cb)),
                TimerCallback::Repeat(cb) => Some(Ready::Repeat(cb)),
            },
        }
    }

    /// Start a frame: returns the animation frame callbacks queued so far
    pub fn begin_frame(&mut self) -> Vec<(FrameId, Box<dyn FnOnce(f64)>)> {
        self.last_frame = self.now;
        std::mem::take(&mut self.frames)
    }

    /// Idle callbacks to run now. At a frame boundary every callback may
    /// run; otherwise only those whose timeout has expired.
    pub fn take_idle(&mut self, idle_period: bool) -> Vec<Box<dyn FnOnce()>> {
        let now = self.now;
        let (run, keep): (Vec<Idle>, Vec<Idle>) = std::mem::take(&mut self.idle)
            .into_iter()
            .partition(|i| idle_period || i.deadline.is_some_and(|d| d <= now));
        self.idle = keep;
        run.into_iter().map(|i| i.callback).collect()
    }
}
