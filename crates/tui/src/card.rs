use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use scroll_reveal_core::{
    EngineHandle, EngineHost, LayoutSlot, Phase, RevealConfig, ScrollSource, ScrollViewport,
    TimerQueue, VisibilityWatch, attach,
};
use scroll_reveal_protocol::{BlockGeometry, Fragment, StyleCommand, WordStyle};

/// Rows taken by the celebration section at the end of the page.
pub const CELEBRATION_ROWS: f64 = 5.0;

/// Share of the celebration section that must be on screen to fire it.
const CELEBRATION_THRESHOLD: f64 = 0.6;

/// A word positioned in the wrapped passage, relative to the passage's
/// top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedWord {
    pub index: u32,
    pub row: u16,
    pub col: u16,
    pub text: String,
}

/// Lay words out centered in `width` columns. Newlines in the source start
/// a new row; other whitespace collapses to one column.
pub fn wrap(fragments: &[Fragment], width: u16) -> (Vec<PlacedWord>, u16) {
    let width = width.max(1);
    let mut placed: Vec<PlacedWord> = Vec::new();
    let mut row: u16 = 0;
    let mut col: u16 = 0;
    let mut pending_space = false;

    for fragment in fragments {
        match fragment {
            Fragment::Space { text } => {
                let breaks = text.chars().filter(|&c| c == '\n').count() as u16;
                if breaks > 0 {
                    // Breaks before the first word have no row to end.
                    if !placed.is_empty() {
                        row = row.saturating_add(breaks);
                    }
                    col = 0;
                    pending_space = false;
                } else {
                    pending_space = col > 0;
                }
            }
            Fragment::Word { index, text } => {
                let len = text.chars().count().min(usize::from(u16::MAX)) as u16;
                let mut start = if pending_space { col.saturating_add(1) } else { col };
                if col > 0 && start.saturating_add(len) > width {
                    row = row.saturating_add(1);
                    start = 0;
                }
                placed.push(PlacedWord {
                    index: *index,
                    row,
                    col: start,
                    text: text.clone(),
                });
                col = start.saturating_add(len);
                pending_space = false;
            }
        }
    }

    let rows = placed.last().map_or(0, |w| w.row + 1);

    // Center every row.
    let mut row_width = vec![0u16; usize::from(rows)];
    for w in &placed {
        let end = w.col.saturating_add(w.text.chars().count() as u16);
        let slot = &mut row_width[usize::from(w.row)];
        *slot = (*slot).max(end);
    }
    for w in &mut placed {
        let used = row_width[usize::from(w.row)].min(width);
        w.col += (width - used) / 2;
    }

    (placed, rows)
}

/// Vertical layout of the whole card, in rows.
///
/// ```text
///   0          intro screen ("scroll down")
///   passage    revealed text
///   ...        room for the passage to disappear
///   celebrate  the section that fires the celebration
///   ...        one screen of tail
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub viewport_rows: f64,
    pub passage: BlockGeometry,
    pub celebration: BlockGeometry,
    pub content_height: f64,
}

impl PageLayout {
    pub fn compute(passage_rows: u16, viewport_rows: u16) -> Self {
        let vh = f64::from(viewport_rows.max(1));
        let passage = BlockGeometry::new(vh + (vh / 2.0).floor(), f64::from(passage_rows));
        let celebration = BlockGeometry::new(passage.bottom() + 3.0 * vh, CELEBRATION_ROWS);
        Self {
            viewport_rows: vh,
            passage,
            celebration,
            content_height: celebration.bottom() + vh,
        }
    }
}

/// Styles as last painted by the engine.
#[derive(Debug, Default)]
pub struct Painted {
    pub rotation: Option<f64>,
    pub words: Vec<Option<WordStyle>>,
}

impl Painted {
    fn apply(&mut self, commands: &[StyleCommand]) {
        self.rotation = None;
        for cmd in commands {
            match *cmd {
                StyleCommand::SetBlockRotation { degrees, .. } => self.rotation = Some(degrees),
                StyleCommand::SetWordStyle {
                    index,
                    opacity,
                    blur_px,
                } => {
                    let i = index as usize;
                    if self.words.len() <= i {
                        self.words.resize(i + 1, None);
                    }
                    self.words[i] = Some(WordStyle { opacity, blur_px });
                }
            }
        }
    }

    pub fn word(&self, index: u32) -> Option<WordStyle> {
        self.words.get(index as usize).copied().flatten()
    }
}

/// The mounted card: a scroll viewport, the revealed passage and the
/// celebration trigger.
pub struct Card {
    viewport: ScrollViewport,
    timers: TimerQueue,
    passage_slot: LayoutSlot,
    celebration_slot: LayoutSlot,
    handle: EngineHandle,
    watch: VisibilityWatch,
    painted: Rc<RefCell<Painted>>,
    celebrations: Rc<Cell<u32>>,
    fragments: Vec<Fragment>,
    placed: Vec<PlacedWord>,
    layout: PageLayout,
    size: (u16, u16),
    blur_strength: f64,
}

impl Card {
    /// Attach the passage before it has a layout, then lay the page out
    /// from the engine's markup and resync, the way a page reveals content
    /// that only gets its size once shown.
    pub fn mount(text: &str, config: RevealConfig, width: u16, rows: u16) -> Self {
        let viewport = ScrollViewport::new(f64::from(rows.max(1)));
        let timers = TimerQueue::new();
        let passage_slot = LayoutSlot::default();

        let painted = Rc::new(RefCell::new(Painted::default()));
        let sink_target = Rc::clone(&painted);
        let handle = attach(
            text,
            EngineHost {
                source: Rc::new(viewport.clone()),
                measure: Box::new(passage_slot.clone()),
                sink: Box::new(move |cmds: &[StyleCommand]| sink_target.borrow_mut().apply(cmds)),
                scheduler: Rc::new(timers.clone()),
            },
            config,
        );
        let blur_strength = handle.config().blur_strength_px;

        let fragments = handle.markup();
        let (placed, passage_rows) = wrap(&fragments, width);
        let layout = PageLayout::compute(passage_rows, rows);
        viewport.set_content_height(layout.content_height);
        passage_slot.set(layout.passage);
        let celebration_slot = LayoutSlot::new(layout.celebration);
        handle.resync();

        let celebrations = Rc::new(Cell::new(0));
        let counter = Rc::clone(&celebrations);
        let watch = VisibilityWatch::attach(
            Rc::new(viewport.clone()),
            Box::new(celebration_slot.clone()),
            CELEBRATION_THRESHOLD,
            move || counter.set(counter.get() + 1),
        );

        Self {
            viewport,
            timers,
            passage_slot,
            celebration_slot,
            handle,
            watch,
            painted,
            celebrations,
            fragments,
            placed,
            layout,
            size: (width, rows),
            blur_strength,
        }
    }

    /// Re-lay the page out for a new terminal size. The engine picks the new
    /// layout up through a debounced resync.
    pub fn fit(&mut self, width: u16, rows: u16) {
        if self.size == (width, rows) {
            return;
        }
        self.size = (width, rows);
        let (placed, passage_rows) = wrap(&self.fragments, width);
        self.placed = placed;
        self.layout = PageLayout::compute(passage_rows, rows);

        self.passage_slot.set(self.layout.passage);
        self.celebration_slot.set(self.layout.celebration);
        self.viewport.set_viewport_height(self.layout.viewport_rows);
        self.viewport.set_content_height(self.layout.content_height);
        // Re-clamp the offset to the new content height.
        self.viewport.scroll_by(0.0);
        self.handle.schedule_resync();
        self.watch.check();
    }

    pub fn scroll_by(&self, rows: f64) {
        self.viewport.scroll_by(rows);
    }

    pub fn scroll_to(&self, offset: f64) {
        self.viewport.set_offset(offset);
    }

    pub fn offset(&self) -> f64 {
        self.viewport.metrics().offset
    }

    pub fn max_offset(&self) -> f64 {
        self.viewport.max_offset().unwrap_or(0.0)
    }

    pub fn tick(&self, elapsed: Duration) {
        self.timers.advance(elapsed);
    }

    pub fn resync(&self) {
        self.handle.resync();
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn placed(&self) -> &[PlacedWord] {
        &self.placed
    }

    pub fn painted(&self) -> Ref<'_, Painted> {
        self.painted.borrow()
    }

    pub fn celebrations(&self) -> u32 {
        self.celebrations.get()
    }

    pub fn phase(&self) -> Phase {
        self.handle.phase()
    }

    pub fn progress(&self) -> Option<f64> {
        self.handle.progress()
    }

    pub fn blur_strength(&self) -> f64 {
        self.blur_strength
    }

    /// Offset at which the passage is fully revealed.
    pub fn reveal_offset(&self) -> Option<f64> {
        let entry = self.handle.entry_offset()?;
        let windows = self.handle.windows()?;
        Some(entry + windows.reveal_end())
    }
}
