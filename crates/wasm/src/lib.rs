#[cfg(target_arch = "wasm32")]
mod timers;

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use scroll_reveal_core::{
    EngineHandle, EngineHost, LayoutSlot, Phase, RecordingSink, RevealConfig, ScrollViewport,
    attach,
};
use scroll_reveal_protocol::{BlockGeometry, Fragment};
use thiserror::Error;
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
type PageTimers = timers::BrowserTimers;
#[cfg(not(target_arch = "wasm32"))]
type PageTimers = scroll_reveal_core::TimerQueue;

#[derive(Debug, Error)]
enum BridgeError {
    #[error("invalid block handle {0}")]
    InvalidHandle(usize),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

struct Mounted {
    handle: EngineHandle,
    layout: LayoutSlot,
    sink: RecordingSink,
}

/// Everything mounted on the page. The browser main thread is the only
/// thread, so this lives in a thread-local rather than behind a lock.
#[derive(Default)]
struct Page {
    viewport: ScrollViewport,
    timers: PageTimers,
    blocks: Vec<Option<Mounted>>,
}

impl Page {
    fn block(&self, handle: usize) -> Result<&Mounted, BridgeError> {
        self.blocks
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or(BridgeError::InvalidHandle(handle))
    }

    fn mount(
        &mut self,
        text: &str,
        config_json: &str,
        top: f64,
        height: f64,
    ) -> Result<usize, BridgeError> {
        let config = if config_json.trim().is_empty() {
            RevealConfig::default()
        } else {
            RevealConfig::from_json(config_json)?
        };
        let layout = LayoutSlot::new(BlockGeometry::new(top, height));
        let sink = RecordingSink::new();
        let handle = attach(
            text,
            EngineHost {
                source: Rc::new(self.viewport.clone()),
                measure: Box::new(layout.clone()),
                sink: Box::new(sink.clone()),
                scheduler: Rc::new(self.timers.clone()),
            },
            config,
        );
        self.blocks.push(Some(Mounted {
            handle,
            layout,
            sink,
        }));
        Ok(self.blocks.len() - 1)
    }

    fn unmount(&mut self, handle: usize) -> Result<(), BridgeError> {
        let mounted = self
            .blocks
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(BridgeError::InvalidHandle(handle))?;
        mounted.handle.detach();
        Ok(())
    }

    /// Latest frame written for `handle` as JSON, or `[]` when nothing
    /// changed since the last call.
    fn take_commands(&self, handle: usize) -> Result<String, BridgeError> {
        let frame = self
            .block(handle)?
            .sink
            .take()
            .pop()
            .unwrap_or_default();
        Ok(serde_json::to_string(&frame)?)
    }
}

thread_local! {
    static PAGE: RefCell<Page> = RefCell::new(Page::default());
}

fn with_page<R>(f: impl FnOnce(&mut Page) -> R) -> R {
    PAGE.with(|page| f(&mut page.borrow_mut()))
}

/// Render fragments as inline HTML: one `<span class="word">` per word,
/// whitespace kept verbatim so the browser wraps it like the source text.
fn render_fragments(fragments: &[Fragment]) -> String {
    let mut html = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Word { index, text } => {
                let _ = write!(html, r#"<span class="word" data-index="{index}">"#);
                escape_into(&mut html, text);
                html.push_str("</span>");
            }
            Fragment::Space { text } => escape_into(&mut html, text),
        }
    }
    html
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Pending => "pending",
        Phase::Degraded => "degraded",
        Phase::Live => "live",
        Phase::Detached => "detached",
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Mount a text block. `top`/`height` place it in the scroll container's
/// content; pass a zero height if it is not laid out yet. Returns a handle.
#[wasm_bindgen]
pub fn attach_reveal(
    text: &str,
    config_json: &str,
    top: f64,
    height: f64,
) -> Result<usize, JsError> {
    let handle = with_page(|page| page.mount(text, config_json, top, height))?;
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&format!("scroll-reveal: mounted block {handle}").into());
    Ok(handle)
}

/// Update a block's layout. Takes effect on the next resync.
#[wasm_bindgen]
pub fn set_layout(handle: usize, top: f64, height: f64) -> Result<(), JsError> {
    with_page(|page| {
        page.block(handle)?
            .layout
            .set(BlockGeometry::new(top, height));
        Ok::<_, BridgeError>(())
    })?;
    Ok(())
}

/// Report the scroll container's position. Every live block recomputes.
#[wasm_bindgen]
pub fn set_scroll(offset: f64, viewport_height: f64) {
    with_page(|page| {
        page.viewport.set_viewport_height(viewport_height);
        page.viewport.set_offset(offset);
    });
}

#[wasm_bindgen]
pub fn set_content_height(height: f64) {
    with_page(|page| page.viewport.set_content_height(height));
}

#[wasm_bindgen]
pub fn resync(handle: usize) -> Result<(), JsError> {
    with_page(|page| page.block(handle).map(|b| b.handle.resync()))?;
    Ok(())
}

#[wasm_bindgen]
pub fn schedule_resync(handle: usize) -> Result<(), JsError> {
    with_page(|page| page.block(handle).map(|b| b.handle.schedule_resync()))?;
    Ok(())
}

#[wasm_bindgen]
pub fn detach(handle: usize) -> Result<(), JsError> {
    with_page(|page| page.unmount(handle))?;
    Ok(())
}

/// Latest style commands for a block, as JSON.
#[wasm_bindgen]
pub fn take_commands(handle: usize) -> Result<String, JsError> {
    Ok(with_page(|page| page.take_commands(handle))?)
}

/// The block's word markup as HTML.
#[wasm_bindgen]
pub fn render_markup(handle: usize) -> Result<String, JsError> {
    let markup = with_page(|page| page.block(handle).map(|b| b.handle.markup()))?;
    Ok(render_fragments(&markup))
}

#[wasm_bindgen]
pub fn phase(handle: usize) -> Result<String, JsError> {
    let phase = with_page(|page| page.block(handle).map(|b| b.handle.phase()))?;
    Ok(phase_name(phase).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scroll_reveal_protocol::StyleCommand;

    #[test]
    fn markup_wraps_words_and_escapes() {
        let fragments = [
            Fragment::Word {
                index: 0,
                text: "<b>".into(),
            },
            Fragment::Space { text: "\n ".into() },
            Fragment::Word {
                index: 1,
                text: "A&B".into(),
            },
        ];
        assert_eq!(
            render_fragments(&fragments),
            r#"<span class="word" data-index="0">&lt;b&gt;</span>"#.to_string()
                + "\n "
                + r#"<span class="word" data-index="1">A&amp;B</span>"#
        );
    }

    #[test]
    fn page_mounts_and_streams_frames() {
        let mut page = Page::default();
        page.viewport.set_viewport_height(800.0);
        let handle = page
            .mount(
                "Oyeeee !! now",
                r#"{"base_opacity": 0, "base_rotation_deg": 0, "blur_strength_px": 10, "reveal_end": "+=100%"}"#,
                1600.0,
                100.0,
            )
            .unwrap();

        page.viewport.set_offset(1600.0);
        let json = page.take_commands(handle).unwrap();
        let frame: Vec<StyleCommand> = serde_json::from_str(&json).unwrap();
        assert_eq!(frame.len(), 3);
        assert!(frame.iter().all(|c| matches!(
            c,
            StyleCommand::SetWordStyle { opacity, .. } if *opacity == 1.0
        )));

        assert_eq!(page.take_commands(handle).unwrap(), "[]");
    }

    #[test]
    fn unmounted_handle_is_invalid() {
        let mut page = Page::default();
        let handle = page.mount("a", "", 0.0, 0.0).unwrap();
        assert_eq!(page.block(handle).unwrap().handle.phase(), Phase::Pending);
        page.unmount(handle).unwrap();
        assert!(matches!(
            page.block(handle),
            Err(BridgeError::InvalidHandle(_))
        ));
        assert!(page.unmount(handle).is_err());
        assert_eq!(page.timers.pending(), 0);
    }

    #[test]
    fn unlaid_block_retries_on_page_timers() {
        use std::time::Duration;

        let mut page = Page::default();
        page.viewport.set_viewport_height(800.0);
        let handle = page.mount("a b", "", 1600.0, 0.0).unwrap();
        assert_eq!(page.timers.pending(), 1);

        page.timers.advance(Duration::from_millis(50));
        assert_eq!(page.block(handle).unwrap().handle.phase(), Phase::Degraded);
        assert_ne!(page.take_commands(handle).unwrap(), "[]");

        let block = page.block(handle).unwrap();
        block.layout.set(BlockGeometry::new(1600.0, 40.0));
        block.handle.resync();
        assert_eq!(block.handle.phase(), Phase::Live);
    }

    #[test]
    fn bad_config_is_rejected() {
        let mut page = Page::default();
        assert!(matches!(
            page.mount("a", "{not json", 0.0, 10.0),
            Err(BridgeError::Config(_))
        ));
    }
}
