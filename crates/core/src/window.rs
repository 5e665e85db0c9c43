//! Scroll windows and staggering.
//!
//! All positions here live in *progress space*: pixels scrolled past the
//! block's entry point, i.e. the offset at which the block's top edge meets
//! the bottom of the viewport. Progress 0 is that entry point.

use scroll_reveal_protocol::{BlockGeometry, ScrollMetrics};

use crate::config::RevealConfig;
use crate::error::RevealError;

/// Words start revealing once the block top is this fraction of the
/// viewport above the viewport bottom.
pub const WORD_ENTRY_INSET: f64 = 0.2;

/// Length of a single unit's tween on the staggered timeline.
pub const UNIT_DURATION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationWindow {
    pub start: f64,
    pub end: f64,
}

impl AnimationWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }

    /// Completion of the window at progress `p`, clamped to `[0, 1]`.
    ///
    /// An empty window behaves as a step at `end`.
    pub fn fraction(&self, p: f64) -> f64 {
        if self.end <= self.start {
            return if p >= self.end { 1.0 } else { 0.0 };
        }
        ((p - self.start) / (self.end - self.start)).clamp(0.0, 1.0)
    }
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Scroll offset at which the block's top meets the viewport bottom.
pub fn entry_offset(block: &BlockGeometry, metrics: &ScrollMetrics) -> f64 {
    block.top - metrics.viewport_height
}

/// The three windows driving one block.
///
/// `disappear.start == rotation_reveal.end == word_reveal.end` for every
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealWindows {
    pub rotation_reveal: AnimationWindow,
    pub word_reveal: AnimationWindow,
    pub disappear: AnimationWindow,
}

impl RevealWindows {
    pub fn resolve(
        config: &RevealConfig,
        block: &BlockGeometry,
        metrics: &ScrollMetrics,
    ) -> Result<Self, RevealError> {
        let viewport_ok = metrics.viewport_height.is_finite() && metrics.viewport_height > 0.0;
        if !block.is_measurable() || !viewport_ok {
            return Err(RevealError::Unmeasurable);
        }

        let reveal_end = config.reveal_end.resolve(block, metrics);
        let disappear_len = config.disappear_distance().resolve(block, metrics);
        let word_start = (WORD_ENTRY_INSET * metrics.viewport_height).min(reveal_end);

        Ok(Self {
            rotation_reveal: AnimationWindow::new(0.0, reveal_end),
            word_reveal: AnimationWindow::new(word_start, reveal_end),
            disappear: AnimationWindow::new(reveal_end, reveal_end + disappear_len),
        })
    }

    pub fn reveal_end(&self) -> f64 {
        self.rotation_reveal.end
    }

    pub fn disappear_end(&self) -> f64 {
        self.disappear.end
    }
}

/// Distribution of start offsets across the units of one staggered tween.
///
/// Each unit tweens for [`UNIT_DURATION`]; the whole staggered timeline
/// (longest delay + one unit duration) is stretched over the window, so
/// every unit finishes by the window end regardless of unit count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stagger {
    /// Unit `i` starts `i * step` after the first, in reading order.
    Forward { step: f64 },
    /// `amount` is spread evenly across all units, last unit first.
    Reverse { amount: f64 },
}

impl Stagger {
    pub fn delay(&self, index: usize, count: usize) -> f64 {
        match *self {
            Stagger::Forward { step } => index as f64 * step,
            Stagger::Reverse { amount } => {
                if count <= 1 {
                    0.0
                } else {
                    let from_end = count - 1 - index.min(count - 1);
                    from_end as f64 * amount / (count - 1) as f64
                }
            }
        }
    }

    fn spread(&self, count: usize) -> f64 {
        if count <= 1 {
            return 0.0;
        }
        match *self {
            Stagger::Forward { step } => step * (count - 1) as f64,
            Stagger::Reverse { amount } => amount,
        }
    }

    /// Completion of unit `index` when the window itself is `t` complete.
    pub fn unit_fraction(&self, t: f64, index: usize, count: usize) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let timeline = t * (UNIT_DURATION + self.spread(count));
        ((timeline - self.delay(index, count)) / UNIT_DURATION).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrollDistance;

    fn layout() -> (BlockGeometry, ScrollMetrics) {
        (BlockGeometry::new(1600.0, 200.0), ScrollMetrics::new(0.0, 800.0))
    }

    #[test]
    fn fraction_is_clamped() {
        let w = AnimationWindow::new(100.0, 300.0);
        assert_eq!(w.fraction(0.0), 0.0);
        assert_eq!(w.fraction(200.0), 0.5);
        assert_eq!(w.fraction(1e9), 1.0);
    }

    #[test]
    fn empty_window_is_a_step() {
        let w = AnimationWindow::new(50.0, 50.0);
        assert!(w.is_empty());
        assert_eq!(w.fraction(49.9), 0.0);
        assert_eq!(w.fraction(50.0), 1.0);
    }

    #[test]
    fn windows_share_boundary() {
        let (block, metrics) = layout();
        for reveal_end in [
            ScrollDistance::ViewportPercent(100.0),
            ScrollDistance::ViewportPercent(7.0),
            ScrollDistance::Pixels(333.3),
            ScrollDistance::BlockBottom,
        ] {
            let config = RevealConfig {
                reveal_end,
                ..RevealConfig::default()
            };
            let w = RevealWindows::resolve(&config, &block, &metrics).unwrap();
            assert_eq!(w.disappear.start, w.rotation_reveal.end);
            assert_eq!(w.disappear.start, w.word_reveal.end);
            assert!(w.word_reveal.start <= w.word_reveal.end);
        }
    }

    #[test]
    fn word_window_starts_after_entry_inset() {
        let (block, metrics) = layout();
        let config = RevealConfig {
            reveal_end: ScrollDistance::ViewportPercent(100.0),
            ..RevealConfig::default()
        };
        let w = RevealWindows::resolve(&config, &block, &metrics).unwrap();
        assert_eq!(w.word_reveal, AnimationWindow::new(160.0, 800.0));
        assert_eq!(w.disappear, AnimationWindow::new(800.0, 2400.0));
    }

    #[test]
    fn unmeasurable_block_is_an_error() {
        let metrics = ScrollMetrics::new(0.0, 800.0);
        let err = RevealWindows::resolve(
            &RevealConfig::default(),
            &BlockGeometry::new(10.0, 0.0),
            &metrics,
        );
        assert_eq!(err, Err(RevealError::Unmeasurable));

        let err = RevealWindows::resolve(
            &RevealConfig::default(),
            &BlockGeometry::new(10.0, 50.0),
            &ScrollMetrics::new(0.0, 0.0),
        );
        assert_eq!(err, Err(RevealError::Unmeasurable));
    }

    #[test]
    fn forward_stagger_orders_units() {
        let s = Stagger::Forward { step: 0.05 };
        let t = 0.3;
        let first = s.unit_fraction(t, 0, 3);
        let last = s.unit_fraction(t, 2, 3);
        assert!(first > last);
        assert_eq!(s.unit_fraction(1.0, 2, 3), 1.0);
        assert_eq!(s.unit_fraction(0.0, 0, 3), 0.0);
    }

    #[test]
    fn reverse_stagger_starts_from_last() {
        let s = Stagger::Reverse { amount: 0.15 };
        assert_eq!(s.delay(2, 3), 0.0);
        assert!((s.delay(0, 3) - 0.15).abs() < 1e-12);
        let t = 0.2;
        assert!(s.unit_fraction(t, 2, 3) > s.unit_fraction(t, 0, 3));
    }

    #[test]
    fn single_unit_has_no_delay() {
        let s = Stagger::Reverse { amount: 0.05 };
        assert_eq!(s.delay(0, 1), 0.0);
        assert_eq!(s.unit_fraction(0.5, 0, 1), 0.5);
    }
}
