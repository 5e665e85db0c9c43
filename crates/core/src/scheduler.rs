use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

pub type Task = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// For host schedulers that hand out their own ids.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// One-shot timers on the host's event loop.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;
    /// Cancelling a timer that already fired (or never existed) is a no-op.
    fn cancel(&self, id: TimerId);
}

#[derive(Default)]
struct QueueState {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), Task>,
}

/// Single-threaded timer queue advanced explicitly by its owner, typically
/// once per frame with the elapsed time. Cloning shares the queue.
#[derive(Clone, Default)]
pub struct TimerQueue {
    inner: Rc<RefCell<QueueState>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Move the clock forward and run every timer that came due, in deadline
    /// order. Returns how many ran.
    ///
    /// Timers scheduled by a running task wait for the next call, even if
    /// their deadline has already passed.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let (target, fence) = {
            let mut state = self.inner.borrow_mut();
            state.now = state.now.saturating_add(elapsed);
            (state.now, TimerId(state.next_id))
        };

        let mut fired = 0;
        loop {
            let task = {
                let mut state = self.inner.borrow_mut();
                let due = state
                    .pending
                    .keys()
                    .take_while(|(deadline, _)| *deadline <= target)
                    .find(|(_, id)| *id < fence)
                    .copied();
                match due {
                    Some(key) => state.pending.remove(&key),
                    None => None,
                }
            };
            let Some(task) = task else { break };
            task();
            fired += 1;
        }
        fired
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.inner.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let deadline = state.now.saturating_add(delay);
        state.pending.insert((deadline, id), task);
        id
    }

    fn cancel(&self, id: TimerId) {
        self.inner
            .borrow_mut()
            .pending
            .retain(|(_, existing), _| *existing != id);
    }
}
