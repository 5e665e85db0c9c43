use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
};
use scroll_reveal_core::{Phase, RevealConfig};
use scroll_reveal_protocol::WordStyle;
use tracing::info;

use crate::card::{CELEBRATION_ROWS, Card};

const POLL_INTERVAL: Duration = Duration::from_millis(16);
const WHEEL_ROWS: f64 = 2.0;

/// Below this opacity a word is not drawn at all.
const MIN_VISIBLE_OPACITY: f64 = 0.05;

const FIREWORKS: [&str; CELEBRATION_ROWS as usize] = [
    r"   .  *  .       *       .  *  .   ",
    r" *   \ | /    .     .    \ | /   * ",
    r"  -- ( * ) --  * ✦ *  -- ( * ) --  ",
    r" *   / | \    .     .    / | \   * ",
    r"   .  *  .       *       .  *  .   ",
];

const SPARK_COLORS: [Color; 5] = [
    Color::LightRed,
    Color::LightYellow,
    Color::LightMagenta,
    Color::LightCyan,
    Color::LightGreen,
];

/// How a word's computed style is drawn in a terminal cell.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Glyphs {
    Hidden,
    /// Heavily blurred: the letters are replaced by shade blocks.
    Smeared(Style),
    Shown(Style),
}

fn glyphs_for(style: WordStyle, blur_strength: f64) -> Glyphs {
    if style.opacity < MIN_VISIBLE_OPACITY {
        return Glyphs::Hidden;
    }
    let grey = (40.0 + style.opacity.clamp(0.0, 1.0) * 215.0).round() as u8;
    let base = Style::default().fg(Color::Rgb(grey, grey, grey));
    let blur = match style.blur_px {
        Some(px) if blur_strength > 0.0 => (px / blur_strength).clamp(0.0, 1.0),
        _ => 0.0,
    };
    if blur >= 0.75 {
        Glyphs::Smeared(base.add_modifier(Modifier::DIM))
    } else if blur >= 0.25 {
        Glyphs::Shown(base.add_modifier(Modifier::DIM))
    } else {
        Glyphs::Shown(base.add_modifier(Modifier::BOLD))
    }
}

/// Horizontal shift approximating a rotation about the block's left-center
/// origin. Cells are about twice as tall as wide.
fn skew(rows_from_center: f64, degrees: f64) -> i32 {
    (-rows_from_center * degrees.to_radians().sin() * 2.0).round() as i32
}

/// Screen row for a page row, if it is inside `area`.
fn screen_row(area: Rect, offset: f64, page_row: f64) -> Option<u16> {
    let r = (page_row - offset.floor()).floor();
    if r < 0.0 || r >= f64::from(area.height) {
        return None;
    }
    Some(area.y + r as u16)
}

fn put_text(buf: &mut Buffer, area: Rect, y: u16, x: i32, text: &str, style: Style) {
    for (i, ch) in text.chars().enumerate() {
        let cx = x + i as i32;
        if cx < 0 || cx >= i32::from(area.width) {
            continue;
        }
        buf[(area.x + cx as u16, y)].set_char(ch).set_style(style);
    }
}

fn centered_col(area: Rect, text: &str) -> i32 {
    (i32::from(area.width) - text.chars().count() as i32) / 2
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Pending => "measuring",
        Phase::Degraded => "degraded",
        Phase::Live => "live",
        Phase::Detached => "detached",
    }
}

fn draw_gate(frame: &mut Frame) {
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(Color::Black)),
        area,
    );
    let mid = area.y + area.height / 2;
    let buf = frame.buffer_mut();
    for (dy, text, style) in [
        (0, "press enter to play", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        (2, "q to quit", Style::default().fg(Color::DarkGray)),
    ] {
        let y = mid.saturating_add(dy);
        if y < area.y + area.height {
            put_text(buf, area, y, centered_col(area, text), text, style);
        }
    }
}

fn draw_card(frame: &mut Frame, card: &Card) {
    let area = frame.area();
    let painted = card.painted();
    let rotation = painted.rotation.unwrap_or(0.0);

    let header_area = Rect::new(0, 0, area.width, 1);
    let progress = card
        .progress()
        .map_or_else(|| "-".to_string(), |p| format!("{p:.0}"));
    let mut title = format!(
        " scroll-reveal | {} | p {progress} | tilt {rotation:.1}° ",
        phase_label(card.phase()),
    );
    if card.celebrations() > 0 {
        title.push_str(&format!("| ✦ x{} ", card.celebrations()));
    }
    title.push_str("| ↑↓ PgUp/PgDn scroll | r resync | q quit ");
    let header = Block::default()
        .title(title)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(header, header_area);

    let content = Rect::new(0, 1, area.width, area.height.saturating_sub(1));
    frame.render_widget(
        Block::default()
            .borders(Borders::NONE)
            .style(Style::default().bg(Color::Black)),
        content,
    );

    let offset = card.offset();
    let layout = card.layout();
    let buf = frame.buffer_mut();

    let hint = "Scroll Down";
    let hint_row = (layout.viewport_rows / 2.0).floor();
    for (dy, text) in [(0.0, hint), (1.0, "↓")] {
        if let Some(y) = screen_row(content, offset, hint_row + dy) {
            let style = Style::default().fg(Color::Gray);
            put_text(buf, content, y, centered_col(content, text), text, style);
        }
    }

    let center_row = ((layout.passage.height - 1.0) / 2.0).max(0.0);
    for word in card.placed() {
        let Some(style) = painted.word(word.index) else {
            continue;
        };
        let Some(y) = screen_row(content, offset, layout.passage.top + f64::from(word.row)) else {
            continue;
        };
        let x = i32::from(word.col) + skew(f64::from(word.row) - center_row, rotation);
        match glyphs_for(style, card.blur_strength()) {
            Glyphs::Hidden => {}
            Glyphs::Smeared(style) => {
                let smear = "░".repeat(word.text.chars().count());
                put_text(buf, content, y, x, &smear, style);
            }
            Glyphs::Shown(style) => put_text(buf, content, y, x, &word.text, style),
        }
    }

    let celebrated = card.celebrations() > 0;
    for (i, line) in FIREWORKS.iter().enumerate() {
        let Some(y) = screen_row(content, offset, layout.celebration.top + i as f64) else {
            continue;
        };
        if celebrated {
            let color = SPARK_COLORS[(i + card.celebrations() as usize) % SPARK_COLORS.len()];
            let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
            put_text(buf, content, y, centered_col(content, line), line, style);
        } else if i == FIREWORKS.len() / 2 {
            let dots = "·  ·  ·";
            let style = Style::default().fg(Color::DarkGray);
            put_text(buf, content, y, centered_col(content, dots), dots, style);
        }
    }
}

fn scroll_key(card: &Card, code: KeyCode, page: f64) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => card.scroll_by(-1.0),
        KeyCode::Down | KeyCode::Char('j') => card.scroll_by(1.0),
        KeyCode::PageUp => card.scroll_by(-page),
        KeyCode::PageDown | KeyCode::Char(' ') => card.scroll_by(page),
        KeyCode::Home => card.scroll_to(0.0),
        KeyCode::End => card.scroll_to(card.max_offset()),
        KeyCode::Char('r') => card.resync(),
        _ => {}
    }
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    text: &str,
    config: &RevealConfig,
) -> Result<()> {
    let mut card: Option<Card> = None;
    let mut last_tick = Instant::now();

    loop {
        let term_size = terminal.size()?;
        let rows = term_size.height.saturating_sub(1);
        if let Some(card) = card.as_mut() {
            card.fit(term_size.width, rows);
        }

        terminal.draw(|frame| match &card {
            Some(card) => draw_card(frame, card),
            None => draw_gate(frame),
        })?;

        if event::poll(POLL_INTERVAL)? {
            let page = f64::from(rows.max(1));
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                        break;
                    }
                    if let Some(card) = &card {
                        scroll_key(card, key.code, page);
                    } else if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                        info!(width = term_size.width, rows, "mounting card");
                        card = Some(Card::mount(text, config.clone(), term_size.width, rows));
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(card) = &card {
                        match mouse.kind {
                            MouseEventKind::ScrollDown => card.scroll_by(WHEEL_ROWS),
                            MouseEventKind::ScrollUp => card.scroll_by(-WHEEL_ROWS),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        let now = Instant::now();
        if let Some(card) = &card {
            card.tick(now - last_tick);
        }
        last_tick = now;
    }

    Ok(())
}

pub fn run(text: &str, config: &RevealConfig) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal even when the loop fails.
    let result = event_loop(&mut terminal, text, config);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
