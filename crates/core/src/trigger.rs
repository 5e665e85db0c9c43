use std::cell::RefCell;
use std::rc::Rc;

use scroll_reveal_protocol::{BlockGeometry, ScrollMetrics};
use tracing::debug;

use crate::source::{BlockMeasure, Listener, ScrollSource, SubscriptionId};

/// Edge trigger for one-shot effects: fires on the transition from not
/// visible to visible and re-arms when the target leaves view again.
#[derive(Debug, Default, Clone)]
pub struct OneShot {
    visible: bool,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current visibility. Returns `true` exactly on a rising edge.
    pub fn observe(&mut self, visible: bool) -> bool {
        let fire = visible && !self.visible;
        self.visible = visible;
        fire
    }

    pub fn is_armed(&self) -> bool {
        !self.visible
    }
}

/// Fraction of the block's height inside the viewport, in `[0, 1]`.
pub fn visible_fraction(block: &BlockGeometry, metrics: &ScrollMetrics) -> f64 {
    if !block.is_measurable() {
        return 0.0;
    }
    let top = block.top.max(metrics.offset);
    let bottom = block.bottom().min(metrics.bottom());
    ((bottom - top).max(0.0) / block.height).clamp(0.0, 1.0)
}

struct WatchState {
    source: Rc<dyn ScrollSource>,
    measure: Box<dyn BlockMeasure>,
    threshold: f64,
    guard: OneShot,
    on_visible: Box<dyn FnMut()>,
    subscription: Option<SubscriptionId>,
    fired: u32,
}

impl WatchState {
    fn check(&mut self, metrics: &ScrollMetrics) {
        let fraction = self
            .measure
            .measure()
            .map_or(0.0, |block| visible_fraction(&block, metrics));
        let visible = fraction > 0.0 && fraction >= self.threshold;
        if self.guard.observe(visible) {
            self.fired += 1;
            debug!(fraction, fired = self.fired, "target became visible");
            (self.on_visible)();
        }
    }
}

/// Calls `on_visible` each time a target section scrolls into view (at
/// least `threshold` of its height visible), once per entry.
///
/// Dropping the watch unsubscribes it.
pub struct VisibilityWatch {
    state: Rc<RefCell<WatchState>>,
}

impl VisibilityWatch {
    pub fn attach(
        source: Rc<dyn ScrollSource>,
        measure: Box<dyn BlockMeasure>,
        threshold: f64,
        on_visible: impl FnMut() + 'static,
    ) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let state = Rc::new(RefCell::new(WatchState {
            source: Rc::clone(&source),
            measure,
            threshold,
            guard: OneShot::new(),
            on_visible: Box::new(on_visible),
            subscription: None,
            fired: 0,
        }));

        let weak = Rc::downgrade(&state);
        let listener: Listener = Rc::new(move |metrics: ScrollMetrics| {
            if let Some(state) = weak.upgrade()
                && let Ok(mut state) = state.try_borrow_mut()
            {
                state.check(&metrics);
            }
        });
        let id = source.subscribe(listener);
        {
            let mut s = state.borrow_mut();
            s.subscription = Some(id);
            s.check(&source.metrics());
        }
        Self { state }
    }

    /// Re-evaluate against the current scroll position, e.g. after the
    /// target moved.
    pub fn check(&self) {
        if let Ok(mut state) = self.state.try_borrow_mut()
            && state.subscription.is_some()
        {
            let metrics = state.source.metrics();
            state.check(&metrics);
        }
    }

    /// How many times the callback has fired.
    pub fn fired(&self) -> u32 {
        self.state.borrow().fired
    }

    pub fn detach(&self) {
        if let Ok(mut state) = self.state.try_borrow_mut()
            && let Some(id) = state.subscription.take()
        {
            state.source.unsubscribe(id);
        }
    }
}

impl Drop for VisibilityWatch {
    fn drop(&mut self) {
        self.detach();
    }
}
