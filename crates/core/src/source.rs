//! Seams between the engine and its host: where scroll offsets come from,
//! where the block's layout comes from, and where styles go.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use scroll_reveal_protocol::{BlockGeometry, ScrollMetrics, StyleCommand};

pub type Listener = Rc<dyn Fn(ScrollMetrics)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A scrollable region whose offset changes over time.
pub trait ScrollSource {
    fn metrics(&self) -> ScrollMetrics;
    fn subscribe(&self, listener: Listener) -> SubscriptionId;
    /// Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Reports where the block currently sits in the scroll content, or `None`
/// while it has no layout.
pub trait BlockMeasure {
    fn measure(&self) -> Option<BlockGeometry>;
}

/// The paint step. Receives one full frame per recompute.
///
/// Sinks run while the engine is busy and must not call back into the
/// engine handle.
pub trait StyleSink {
    fn apply(&mut self, commands: &[StyleCommand]);
}

impl<F: FnMut(&[StyleCommand])> StyleSink for F {
    fn apply(&mut self, commands: &[StyleCommand]) {
        self(commands);
    }
}

// --- In-memory scroll viewport ---

#[derive(Default)]
struct ViewportState {
    metrics: ScrollMetrics,
    content_height: Option<f64>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

/// A scroll viewport driven by the host (or a test) calling
/// [`ScrollViewport::set_offset`]. Cloning shares the same viewport.
///
/// Listeners are notified synchronously on every offset change. A listener
/// added during a notification is first called on the next one.
#[derive(Clone, Default)]
pub struct ScrollViewport {
    inner: Rc<RefCell<ViewportState>>,
}

impl ScrollViewport {
    pub fn new(viewport_height: f64) -> Self {
        let viewport = Self::default();
        viewport.inner.borrow_mut().metrics.viewport_height = viewport_height;
        viewport
    }

    /// Total scrollable content height. Offsets are clamped to
    /// `[0, content_height - viewport_height]` once this is known.
    pub fn set_content_height(&self, height: f64) {
        self.inner.borrow_mut().content_height = Some(height);
    }

    pub fn max_offset(&self) -> Option<f64> {
        let state = self.inner.borrow();
        state
            .content_height
            .map(|h| (h - state.metrics.viewport_height).max(0.0))
    }

    pub fn set_viewport_height(&self, height: f64) {
        self.inner.borrow_mut().metrics.viewport_height = height;
    }

    pub fn set_offset(&self, offset: f64) {
        let clamped = match self.max_offset() {
            Some(max) => offset.clamp(0.0, max),
            None => offset.max(0.0),
        };
        self.inner.borrow_mut().metrics.offset = clamped;
        self.notify();
    }

    pub fn scroll_by(&self, delta: f64) {
        let offset = self.inner.borrow().metrics.offset;
        self.set_offset(offset + delta);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn notify(&self) {
        let (metrics, listeners): (_, Vec<Listener>) = {
            let state = self.inner.borrow();
            let listeners = state.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
            (state.metrics, listeners)
        };
        for listener in listeners {
            listener(metrics);
        }
    }
}

impl ScrollSource for ScrollViewport {
    fn metrics(&self) -> ScrollMetrics {
        self.inner.borrow().metrics
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let mut state = self.inner.borrow_mut();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|(existing, _)| *existing != id);
    }
}

/// Block layout written by the host whenever it lays the block out.
/// Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct LayoutSlot(Rc<Cell<Option<BlockGeometry>>>);

impl LayoutSlot {
    pub fn new(geometry: BlockGeometry) -> Self {
        Self(Rc::new(Cell::new(Some(geometry))))
    }

    pub fn set(&self, geometry: BlockGeometry) {
        self.0.set(Some(geometry));
    }

    /// The block was unmounted or lost its layout.
    pub fn clear(&self) {
        self.0.set(None);
    }
}

impl BlockMeasure for LayoutSlot {
    fn measure(&self) -> Option<BlockGeometry> {
        self.0.get().filter(BlockGeometry::is_measurable)
    }
}

/// Sink that keeps every frame it receives. Cloning shares the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink(Rc<RefCell<Vec<Vec<StyleCommand>>>>);

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames written so far.
    pub fn write_count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn last(&self) -> Option<Vec<StyleCommand>> {
        self.0.borrow().last().cloned()
    }

    /// Drain all recorded frames.
    pub fn take(&self) -> Vec<Vec<StyleCommand>> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl StyleSink for RecordingSink {
    fn apply(&mut self, commands: &[StyleCommand]) {
        self.0.borrow_mut().push(commands.to_vec());
    }
}
