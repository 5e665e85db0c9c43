//! Pure mapping from scroll progress to styles.
//!
//! Nothing here touches a host: the same inputs always give the same
//! commands, which is what makes recomputes idempotent.

use scroll_reveal_protocol::{StyleCommand, TransformOrigin, WordStyle};

use crate::config::RevealConfig;
use crate::window::{RevealWindows, Stagger, lerp};

/// Block rotation at progress `p`, or `None` when rotation is disabled.
///
/// Rotates from the base angle to level over the reveal window, then back
/// to the base angle over the disappear window.
pub fn block_rotation(p: f64, windows: &RevealWindows, config: &RevealConfig) -> Option<f64> {
    let base = config.base_rotation_deg;
    if base == 0.0 {
        return None;
    }
    let degrees = if p <= windows.reveal_end() {
        lerp(base, 0.0, windows.rotation_reveal.fraction(p))
    } else {
        lerp(0.0, base, windows.disappear.fraction(p))
    };
    Some(degrees)
}

/// How revealed word `index` of `count` is at progress `p`: 0 is the
/// resting state, 1 fully revealed.
pub fn word_reveal(
    p: f64,
    index: usize,
    count: usize,
    windows: &RevealWindows,
    config: &RevealConfig,
) -> f64 {
    if p <= windows.reveal_end() {
        let t = windows.word_reveal.fraction(p);
        Stagger::Forward {
            step: config.stagger_step,
        }
        .unit_fraction(t, index, count)
    } else {
        let t = windows.disappear.fraction(p);
        let amount = count as f64 * config.stagger_step;
        1.0 - Stagger::Reverse { amount }.unit_fraction(t, index, count)
    }
}

pub fn style_at(revealed: f64, config: &RevealConfig) -> WordStyle {
    WordStyle {
        opacity: lerp(config.base_opacity, 1.0, revealed),
        blur_px: config
            .enable_blur
            .then(|| lerp(config.blur_strength_px, 0.0, revealed)),
    }
}

pub fn word_style(
    p: f64,
    index: usize,
    count: usize,
    windows: &RevealWindows,
    config: &RevealConfig,
) -> WordStyle {
    style_at(word_reveal(p, index, count, windows, config), config)
}

/// Resting (unrevealed) style.
pub fn baseline_style(config: &RevealConfig) -> WordStyle {
    style_at(0.0, config)
}

/// Append the full frame for progress `p` to `out`: the block rotation
/// (when enabled) followed by one command per word in index order.
pub fn frame_into(
    out: &mut Vec<StyleCommand>,
    p: f64,
    count: usize,
    windows: &RevealWindows,
    config: &RevealConfig,
) {
    if let Some(degrees) = block_rotation(p, windows, config) {
        out.push(StyleCommand::SetBlockRotation {
            degrees,
            origin: TransformOrigin::default(),
        });
    }
    out.extend(
        (0..count).map(|i| StyleCommand::word(i as u32, word_style(p, i, count, windows, config))),
    );
}

pub fn compute_frame(
    p: f64,
    count: usize,
    windows: &RevealWindows,
    config: &RevealConfig,
) -> Vec<StyleCommand> {
    let mut out = Vec::with_capacity(count + 1);
    frame_into(&mut out, p, count, windows, config);
    out
}

/// Append the resting frame: every word unrevealed, block at its base angle.
pub fn baseline_into(out: &mut Vec<StyleCommand>, count: usize, config: &RevealConfig) {
    if config.base_rotation_deg != 0.0 {
        out.push(StyleCommand::SetBlockRotation {
            degrees: config.base_rotation_deg,
            origin: TransformOrigin::default(),
        });
    }
    let style = baseline_style(config);
    out.extend((0..count).map(|i| StyleCommand::word(i as u32, style)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrollDistance;
    use scroll_reveal_protocol::{BlockGeometry, ScrollMetrics};

    const VIEWPORT: f64 = 1000.0;

    fn setup(config: &RevealConfig) -> RevealWindows {
        RevealWindows::resolve(
            config,
            &BlockGeometry::new(3000.0, 240.0),
            &ScrollMetrics::new(0.0, VIEWPORT),
        )
        .unwrap()
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

    #[test]
    fn baseline_before_window() {
        let config = card_config();
        let w = setup(&config);
        for p in [-500.0, 0.0, w.word_reveal.start] {
            for i in 0..3 {
                let s = word_style(p, i, 3, &w, &config);
                assert_eq!(s.opacity, 0.0);
                assert_eq!(s.blur_px, Some(10.0));
            }
        }
    }

    #[test]
    fn fully_revealed_at_window_end() {
        let config = card_config();
        let w = setup(&config);
        for i in 0..3 {
            let s = word_style(w.reveal_end(), i, 3, &w, &config);
            assert_eq!(s.opacity, 1.0);
            assert_eq!(s.blur_px, Some(0.0));
        }
    }

    #[test]
    fn opacity_is_monotonic_during_reveal() {
        let config = card_config();
        let w = setup(&config);
        for i in 0..5 {
            let mut prev = f64::NEG_INFINITY;
            let mut p = w.word_reveal.start;
            while p <= w.reveal_end() {
                let o = word_style(p, i, 5, &w, &config).opacity;
                assert!(o >= prev, "word {i} dropped from {prev} to {o} at {p}");
                prev = o;
                p += 7.0;
            }
        }
    }

    #[test]
    fn disappear_runs_last_word_first() {
        let config = card_config();
        let w = setup(&config);
        let p = w.disappear.start + w.disappear.len() * 0.2;
        let first = word_style(p, 0, 3, &w, &config);
        let last = word_style(p, 2, 3, &w, &config);
        assert!(last.opacity < first.opacity);
        assert!(last.blur_px > first.blur_px);
    }

    #[test]
    fn back_to_baseline_after_disappear() {
        let config = card_config();
        let w = setup(&config);
        for i in 0..3 {
            let s = word_style(w.disappear_end(), i, 3, &w, &config);
            assert_eq!(s, baseline_style(&config));
        }
    }

    #[test]
    fn blur_disabled_emits_no_filter() {
        let config = RevealConfig {
            enable_blur: false,
            ..card_config()
        };
        let w = setup(&config);
        assert_eq!(word_style(0.0, 0, 1, &w, &config).blur_px, None);
    }

    #[test]
    fn zero_rotation_is_skipped() {
        let config = card_config();
        let w = setup(&config);
        assert_eq!(block_rotation(300.0, &w, &config), None);
        let frame = compute_frame(300.0, 2, &w, &config);
        assert_eq!(frame.len(), 2);
        assert!(frame.iter().all(|c| c.word_index().is_some()));
    }

    #[test]
    fn rotation_levels_then_returns() {
        let config = RevealConfig {
            base_rotation_deg: 3.0,
            ..card_config()
        };
        let w = setup(&config);
        assert_eq!(block_rotation(0.0, &w, &config), Some(3.0));
        assert_eq!(
            block_rotation(w.reveal_end() / 2.0, &w, &config),
            Some(1.5)
        );
        assert_eq!(block_rotation(w.reveal_end(), &w, &config), Some(0.0));
        assert_eq!(block_rotation(w.disappear_end(), &w, &config), Some(3.0));
    }

    #[test]
    fn same_progress_same_frame() {
        let config = RevealConfig {
            base_rotation_deg: -2.0,
            ..card_config()
        };
        let w = setup(&config);
        assert_eq!(
            compute_frame(512.0, 4, &w, &config),
            compute_frame(512.0, 4, &w, &config)
        );
    }

    #[test]
    fn baseline_frame_includes_rotation() {
        let config = RevealConfig {
            base_rotation_deg: 3.0,
            ..card_config()
        };
        let mut out = Vec::new();
        baseline_into(&mut out, 2, &config);
        assert_eq!(out.len(), 3);
        assert!(matches!(
            out[0],
            StyleCommand::SetBlockRotation { degrees, .. } if degrees == 3.0
        ));
    }
}
