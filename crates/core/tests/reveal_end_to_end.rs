//! Integration test: attach a short passage to an in-memory viewport and
//! drive it through reveal, disappear, resync and detach.

use std::rc::Rc;

use scroll_reveal_core::{
    EngineHandle, EngineHost, LayoutSlot, Phase, RecordingSink, RevealConfig, ScrollDistance,
    ScrollSource, ScrollViewport, TimerQueue, attach,
};
use scroll_reveal_protocol::{BlockGeometry, Fragment, StyleCommand};

const VIEWPORT: f64 = 900.0;
const BLOCK_TOP: f64 = 1800.0;

struct Page {
    viewport: ScrollViewport,
    layout: LayoutSlot,
    sink: RecordingSink,
    timers: TimerQueue,
}

impl Page {
    fn new() -> Self {
        let viewport = ScrollViewport::new(VIEWPORT);
        viewport.set_content_height(BLOCK_TOP + 120.0 + 3.0 * VIEWPORT);
        Self {
            viewport,
            layout: LayoutSlot::new(BlockGeometry::new(BLOCK_TOP, 120.0)),
            sink: RecordingSink::new(),
            timers: TimerQueue::new(),
        }
    }

    fn attach(&self, text: &str, config: RevealConfig) -> EngineHandle {
        attach(
            text,
            EngineHost {
                source: Rc::new(self.viewport.clone()),
                measure: Box::new(self.layout.clone()),
                sink: Box::new(self.sink.clone()),
                scheduler: Rc::new(self.timers.clone()),
            },
            config,
        )
    }

    /// Scroll so the block is `p` pixels past its entry point.
    fn scroll_to_progress(&self, p: f64) {
        self.viewport.set_offset(BLOCK_TOP - VIEWPORT + p);
    }
}

fn card_config() -> RevealConfig {
    RevealConfig {
        base_opacity: 0.0,
        base_rotation_deg: 0.0,
        blur_strength_px: 10.0,
        enable_blur: true,
        reveal_end: ScrollDistance::ViewportPercent(100.0),
        ..RevealConfig::default()
    }
}

fn word_styles(frame: &[StyleCommand]) -> Vec<(f64, Option<f64>)> {
    frame
        .iter()
        .filter_map(|c| match c {
            StyleCommand::SetWordStyle {
                opacity, blur_px, ..
            } => Some((*opacity, *blur_px)),
            StyleCommand::SetBlockRotation { .. } => None,
        })
        .collect()
}

#[test]
fn three_words_reveal_in_order() {
    let page = Page::new();
    let handle = page.attach("Oyeeee !! now", card_config());
    assert_eq!(handle.word_count(), 3);

    page.scroll_to_progress(0.0);
    let frame = page.sink.last().expect("frame at p=0");
    assert_eq!(word_styles(&frame), vec![(0.0, Some(10.0)); 3]);

    let reveal_end = handle.windows().expect("measured").reveal_end();
    assert_eq!(reveal_end, VIEWPORT);
    page.scroll_to_progress(reveal_end);
    let frame = page.sink.last().expect("frame at reveal end");
    assert_eq!(word_styles(&frame), vec![(1.0, Some(0.0)); 3]);

    // Step through the reveal window and note where each word first hits 1.
    let mut first_full = [None; 3];
    let mut p = 0.0;
    while p <= reveal_end {
        page.scroll_to_progress(p);
        for word in handle.words() {
            let slot = &mut first_full[word.index as usize];
            if slot.is_none() && word.style.opacity >= 1.0 {
                *slot = Some(p);
            }
        }
        p += 5.0;
    }
    let [w0, _, w2] = first_full.map(|p| p.expect("every word is revealed"));
    assert!(w0 < w2, "word 0 at {w0}, word 2 at {w2}");
}

#[test]
fn passage_disappears_and_returns_to_rest() {
    let page = Page::new();
    let handle = page.attach("Oyeeee !! now", card_config());
    let windows = handle.windows().expect("measured");
    assert_eq!(windows.disappear.start, windows.reveal_end());
    assert_eq!(windows.disappear.len(), 2.0 * VIEWPORT);

    page.scroll_to_progress(windows.disappear.start + 0.1 * windows.disappear.len());
    let words = handle.words();
    assert!(words[2].style.opacity < words[0].style.opacity);

    page.scroll_to_progress(windows.disappear_end());
    let frame = page.sink.last().expect("frame");
    assert_eq!(word_styles(&frame), vec![(0.0, Some(10.0)); 3]);
}

#[test]
fn resync_is_idempotent() {
    let page = Page::new();
    let handle = page.attach("When does a man die?", card_config());
    page.scroll_to_progress(420.0);

    handle.resync();
    let first = page.sink.last();
    handle.resync();
    let second = page.sink.last();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn resync_picks_up_moved_block() {
    let page = Page::new();
    let handle = page.attach("Scroll Down", card_config());
    page.scroll_to_progress(VIEWPORT);
    assert!(handle.words().iter().all(|w| w.style.opacity == 1.0));

    // Content appears above the block and pushes it down a full screen.
    page.layout.set(BlockGeometry::new(BLOCK_TOP + VIEWPORT, 120.0));
    handle.schedule_resync();
    page.timers.advance(std::time::Duration::from_millis(100));
    assert!(handle.words().iter().all(|w| w.style.opacity == 0.0));
}

#[test]
fn no_writes_after_detach() {
    let page = Page::new();
    let handle = page.attach("Oyeeee !! now", card_config());
    page.scroll_to_progress(100.0);
    let before = page.sink.write_count();

    handle.detach();
    page.scroll_to_progress(500.0);
    page.viewport.set_offset(page.viewport.metrics().offset + 1.0);
    handle.resync();
    page.timers.advance(std::time::Duration::from_secs(1));

    assert_eq!(page.sink.write_count(), before);
    assert_eq!(handle.phase(), Phase::Detached);
}

#[test]
fn rotation_tracks_the_block() {
    let page = Page::new();
    let handle = page.attach(
        "tilted",
        RevealConfig {
            base_rotation_deg: 4.0,
            ..card_config()
        },
    );
    page.scroll_to_progress(0.0);
    let frame = page.sink.last().expect("frame");
    assert!(matches!(
        frame[0],
        StyleCommand::SetBlockRotation { degrees, .. } if degrees == 4.0
    ));

    page.scroll_to_progress(handle.windows().expect("measured").reveal_end());
    let frame = page.sink.last().expect("frame");
    assert!(matches!(
        frame[0],
        StyleCommand::SetBlockRotation { degrees, .. } if degrees == 0.0
    ));
}

#[test]
fn markup_reproduces_text() {
    let page = Page::new();
    let text = "\n  When he is hit by a bullet?  No!\n";
    let handle = page.attach(text, card_config());
    let markup = handle.markup();
    let joined: String = markup.iter().map(Fragment::text).collect();
    assert_eq!(joined, text);
    let words = markup
        .iter()
        .filter(|f| matches!(f, Fragment::Word { .. }))
        .count();
    assert_eq!(words, handle.word_count());
}
