//! `setTimeout`-backed timers for the engine's attach retry and debounced
//! resync, so they fire without the page pumping anything.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use gloo_timers::callback::Timeout;
use scroll_reveal_core::Scheduler;
use scroll_reveal_core::scheduler::{Task, TimerId};

#[derive(Default)]
struct Table {
    next_id: u64,
    live: HashMap<TimerId, Timeout>,
}

/// Cloning shares the timer table.
#[derive(Clone, Default)]
pub struct BrowserTimers {
    inner: Rc<RefCell<Table>>,
}

impl Scheduler for BrowserTimers {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = {
            let mut table = self.inner.borrow_mut();
            let id = TimerId::new(table.next_id);
            table.next_id += 1;
            id
        };
        let table = Rc::downgrade(&self.inner);
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, move || {
            let fired = table.upgrade().and_then(|table| {
                let mut table = table.borrow_mut();
                table.live.remove(&id)
            });
            // Our own closure is running: forget the handle instead of
            // dropping it.
            if let Some(timeout) = fired {
                timeout.forget();
            }
            task();
        });
        self.inner.borrow_mut().live.insert(id, timeout);
        id
    }

    fn cancel(&self, id: TimerId) {
        // Dropping a `Timeout` clears it.
        let removed = self.inner.borrow_mut().live.remove(&id);
        drop(removed);
    }
}
