//! The reveal engine: owns the word units of one text block, listens to a
//! scroll source and writes a style frame on every scroll update.
//!
//! ```text
//!   attach ──▶ Pending ──(retry, 50ms)──▶ Degraded
//!      │          │                          │
//!      └──────────┴──────▶ Live ◀──resync────┘
//!                            │
//!   detach (from any) ───────┴──▶ Detached
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use scroll_reveal_protocol::{Fragment, ScrollMetrics, StyleCommand, WordStyle};
use tracing::{debug, trace, warn};

use crate::config::RevealConfig;
use crate::error::RevealError;
use crate::scheduler::{Scheduler, TimerId};
use crate::source::{BlockMeasure, Listener, ScrollSource, StyleSink, SubscriptionId};
use crate::style;
use crate::tokenizer;
use crate::window::{RevealWindows, entry_offset};

/// Delay before the single retry when the block has no layout at attach.
pub const ATTACH_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Debounce for [`EngineHandle::schedule_resync`].
pub const RESYNC_DEBOUNCE: Duration = Duration::from_millis(100);

/// Host collaborators an engine is attached to.
pub struct EngineHost {
    pub source: Rc<dyn ScrollSource>,
    pub measure: Box<dyn BlockMeasure>,
    pub sink: Box<dyn StyleSink>,
    pub scheduler: Rc<dyn Scheduler>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Block was not measurable at attach; a retry is scheduled.
    Pending,
    /// Block stayed unmeasurable; words are shown at baseline until a
    /// resync succeeds.
    Degraded,
    Live,
    Detached,
}

/// One animatable word.
#[derive(Debug, Clone, PartialEq)]
pub struct WordUnit {
    pub text: String,
    pub index: u32,
    pub style: WordStyle,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    /// Scroll offset where progress is zero.
    entry: f64,
    windows: RevealWindows,
}

struct Engine {
    this: Weak<RefCell<Engine>>,
    config: RevealConfig,
    host: EngineHost,
    fragments: Vec<Fragment>,
    units: Vec<WordUnit>,
    /// Shared with the handle so it stays readable (and detachable) while a
    /// frame is being written. `Detached` is terminal.
    phase: Rc<Cell<Phase>>,
    layout: Option<Layout>,
    progress: Option<f64>,
    subscription: Option<SubscriptionId>,
    retry_timer: Option<TimerId>,
    resync_timer: Option<TimerId>,
    /// Reused between frames so scroll updates don't allocate.
    frame: Vec<StyleCommand>,
}

impl Engine {
    fn phase(&self) -> Phase {
        self.phase.get()
    }

    fn is_detached(&self) -> bool {
        self.phase() == Phase::Detached
    }

    fn set_phase(&self, phase: Phase) {
        if !self.is_detached() {
            self.phase.set(phase);
        }
    }

    fn measure(&self) -> Result<(Layout, ScrollMetrics), RevealError> {
        let block = self.host.measure.measure().ok_or(RevealError::Unmeasurable)?;
        let metrics = self.host.source.metrics();
        let windows = RevealWindows::resolve(&self.config, &block, &metrics)?;
        let layout = Layout {
            entry: entry_offset(&block, &metrics),
            windows,
        };
        Ok((layout, metrics))
    }

    /// Re-measure and write a fresh frame.
    fn refresh(&mut self) -> Result<(), RevealError> {
        let (layout, metrics) = self.measure()?;
        debug!(
            entry = layout.entry,
            reveal_end = layout.windows.reveal_end(),
            disappear_end = layout.windows.disappear_end(),
            "reveal windows measured"
        );
        self.layout = Some(layout);
        self.set_phase(Phase::Live);
        self.recompute(metrics);
        Ok(())
    }

    fn recompute(&mut self, metrics: ScrollMetrics) {
        if self.is_detached() {
            return;
        }
        let Some(layout) = self.layout else {
            return;
        };
        let p = metrics.offset - layout.entry;

        self.frame.clear();
        style::frame_into(
            &mut self.frame,
            p,
            self.units.len(),
            &layout.windows,
            &self.config,
        );
        self.sync_units();
        self.progress = Some(p);
        self.host.sink.apply(&self.frame);
    }

    fn write_baseline(&mut self) {
        if self.is_detached() {
            return;
        }
        self.layout = None;
        self.progress = None;
        self.frame.clear();
        style::baseline_into(&mut self.frame, self.units.len(), &self.config);
        self.sync_units();
        self.host.sink.apply(&self.frame);
    }

    fn degrade(&mut self, err: &RevealError) {
        warn!(%err, words = self.units.len(), "reveal degraded, showing text unrevealed");
        self.set_phase(Phase::Degraded);
        self.write_baseline();
    }

    fn sync_units(&mut self) {
        for cmd in &self.frame {
            if let StyleCommand::SetWordStyle {
                index,
                opacity,
                blur_px,
            } = *cmd
                && let Some(unit) = self.units.get_mut(index as usize)
            {
                unit.style = WordStyle { opacity, blur_px };
            }
        }
    }

    fn on_scroll(&mut self, metrics: ScrollMetrics) {
        if self.phase() == Phase::Live {
            self.recompute(metrics);
        }
    }

    fn schedule_retry(&mut self) {
        let weak = self.this.clone();
        let id = self.host.scheduler.schedule(
            ATTACH_RETRY_DELAY,
            Box::new(move || {
                with_engine(&weak, |engine| {
                    engine.retry_timer = None;
                    engine.retry_attach();
                });
            }),
        );
        self.retry_timer = Some(id);
    }

    fn retry_attach(&mut self) {
        if self.phase() != Phase::Pending {
            return;
        }
        match self.refresh() {
            Ok(()) => debug!("block measurable on retry"),
            Err(err) => self.degrade(&err),
        }
    }

    fn resync(&mut self) -> Result<(), RevealError> {
        if self.is_detached() {
            return Err(RevealError::Detached);
        }
        if let Some(id) = self.retry_timer.take() {
            self.host.scheduler.cancel(id);
        }
        self.refresh().inspect_err(|err| self.degrade(err))
    }

    fn schedule_resync(&mut self) {
        if self.is_detached() {
            return;
        }
        if let Some(id) = self.resync_timer.take() {
            self.host.scheduler.cancel(id);
        }
        let weak = self.this.clone();
        let id = self.host.scheduler.schedule(
            RESYNC_DEBOUNCE,
            Box::new(move || {
                with_engine(&weak, |engine| {
                    engine.resync_timer = None;
                    // A failed resync already degraded and logged.
                    let _ = engine.resync();
                });
            }),
        );
        self.resync_timer = Some(id);
    }

    /// Mark detached and drop everything tied to the host. Safe to repeat;
    /// only the first call after the mark does any work.
    fn release(&mut self) {
        self.phase.set(Phase::Detached);
        let subscription = self.subscription.take();
        let timers = [self.retry_timer.take(), self.resync_timer.take()];
        if let Some(id) = subscription {
            self.host.source.unsubscribe(id);
        }
        for id in timers.into_iter().flatten() {
            self.host.scheduler.cancel(id);
        }
        if subscription.is_some() {
            debug!(words = self.units.len(), "reveal engine detached");
        }
        self.layout = None;
        self.progress = None;
        self.units.clear();
        self.fragments.clear();
        self.frame.clear();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run `f` on the engine behind `weak` if it is still alive, attached and
/// not busy.
///
/// A busy engine means a sink or callback re-entered it mid-frame; the
/// nested call is dropped rather than panicking on the borrow. An engine
/// detached while busy finishes releasing here.
fn with_engine<R>(weak: &Weak<RefCell<Engine>>, f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
    let engine = weak.upgrade()?;
    let Ok(mut engine) = engine.try_borrow_mut() else {
        warn!("reveal engine re-entered while busy, call ignored");
        return None;
    };
    if engine.is_detached() {
        engine.release();
        return None;
    }
    Some(f(&mut engine))
}

/// Attach a text block to a scroll source.
///
/// Splits `text` into word units, subscribes to scroll updates and writes the
/// first frame right away. When the block cannot be measured yet, the first
/// frame is deferred by [`ATTACH_RETRY_DELAY`]; if it still cannot be
/// measured then, the words are shown unrevealed until a resync succeeds.
pub fn attach(text: &str, host: EngineHost, config: RevealConfig) -> EngineHandle {
    let config = config.sanitized();
    let tokens = tokenizer::tokenize(text);
    let baseline = style::baseline_style(&config);
    let units: Vec<WordUnit> = tokenizer::words(&tokens)
        .map(|(index, word)| WordUnit {
            text: word.to_string(),
            index,
            style: baseline,
        })
        .collect();
    let fragments = tokenizer::to_fragments(&tokens);
    let frame = Vec::with_capacity(units.len() + 1);
    let phase = Rc::new(Cell::new(Phase::Pending));

    let engine = Rc::new_cyclic(|this| {
        RefCell::new(Engine {
            this: this.clone(),
            config: config.clone(),
            host,
            fragments,
            units,
            phase: Rc::clone(&phase),
            layout: None,
            progress: None,
            subscription: None,
            retry_timer: None,
            resync_timer: None,
            frame,
        })
    });

    {
        let mut e = engine.borrow_mut();
        let weak = Rc::downgrade(&engine);
        let listener: Listener = Rc::new(move |metrics: ScrollMetrics| {
            with_engine(&weak, |engine| engine.on_scroll(metrics));
        });
        let id = e.host.source.subscribe(listener);
        e.subscription = Some(id);
        debug!(words = e.units.len(), "reveal engine attached");

        if let Err(err) = e.refresh() {
            debug!(%err, "deferring first frame");
            e.schedule_retry();
        }
    }

    EngineHandle {
        engine,
        phase,
        config,
    }
}

/// Owner's handle on an attached engine. Dropping it detaches.
///
/// Every method may be called from inside the engine's own sink. Reads made
/// there see an empty engine, since the frame is still being written.
pub struct EngineHandle {
    engine: Rc<RefCell<Engine>>,
    phase: Rc<Cell<Phase>>,
    config: RevealConfig,
}

impl EngineHandle {
    /// Re-measure the block and recompute every style immediately.
    ///
    /// Call after anything moved the block (content appearing above it, a
    /// resize). Calling it on a detached handle does nothing.
    pub fn resync(&self) {
        match self.try_resync() {
            Ok(()) | Err(RevealError::Detached) => {}
            Err(err) => trace!(%err, "resync left engine degraded"),
        }
    }

    /// Like [`EngineHandle::resync`], reporting why it did not go live.
    pub fn try_resync(&self) -> Result<(), RevealError> {
        let weak = Rc::downgrade(&self.engine);
        with_engine(&weak, Engine::resync).unwrap_or(Err(RevealError::Detached))
    }

    /// Resync after [`RESYNC_DEBOUNCE`]. Calls arriving before the timer
    /// fires re-arm it, so a burst of layout changes costs one resync.
    pub fn schedule_resync(&self) {
        let weak = Rc::downgrade(&self.engine);
        with_engine(&weak, Engine::schedule_resync);
    }

    /// Unsubscribe, cancel pending timers and discard all word units.
    /// No style is written after this returns, even when called from the
    /// sink. Repeated calls are no-ops.
    pub fn detach(&self) {
        self.phase.set(Phase::Detached);
        if let Ok(mut engine) = self.engine.try_borrow_mut() {
            engine.release();
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn is_detached(&self) -> bool {
        self.phase() == Phase::Detached
    }

    fn read<R: Default>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        if self.is_detached() {
            return R::default();
        }
        self.engine
            .try_borrow()
            .map(|engine| f(&engine))
            .unwrap_or_default()
    }

    /// Progress (pixels past the entry point) of the last computed frame.
    pub fn progress(&self) -> Option<f64> {
        self.read(|e| e.progress)
    }

    pub fn word_count(&self) -> usize {
        self.read(|e| e.units.len())
    }

    pub fn words(&self) -> Vec<WordUnit> {
        self.read(|e| e.units.clone())
    }

    pub fn markup(&self) -> Vec<Fragment> {
        self.read(|e| e.fragments.clone())
    }

    pub fn windows(&self) -> Option<RevealWindows> {
        self.read(|e| e.layout.map(|l| l.windows))
    }

    /// Scroll offset at which progress is zero, once measured.
    pub fn entry_offset(&self) -> Option<f64> {
        self.read(|e| e.layout.map(|l| l.entry))
    }

    /// The configuration in effect, after sanitizing.
    pub fn config(&self) -> &RevealConfig {
        &self.config
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
