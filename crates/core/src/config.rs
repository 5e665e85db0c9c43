use std::fmt;
use std::str::FromStr;

use scroll_reveal_protocol::{BlockGeometry, ScrollMetrics};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::RevealError;

/// How far past the block's entry point (block top meeting the viewport
/// bottom) a scroll window extends.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScrollDistance {
    /// `"+=N%"`: N percent of the viewport height.
    ViewportPercent(f64),
    /// `"+=N"` or `"+=Npx"`.
    Pixels(f64),
    /// `"bottom bottom"`: until the block's bottom meets the viewport bottom.
    #[default]
    BlockBottom,
}

impl ScrollDistance {
    /// Distance in pixels for the given layout.
    pub fn resolve(&self, block: &BlockGeometry, metrics: &ScrollMetrics) -> f64 {
        let px = match self {
            ScrollDistance::ViewportPercent(pct) => pct / 100.0 * metrics.viewport_height,
            ScrollDistance::Pixels(px) => *px,
            ScrollDistance::BlockBottom => block.height,
        };
        if px.is_finite() { px.max(0.0) } else { 0.0 }
    }

    /// The distance used for the disappear window when none is configured.
    ///
    /// Relative distances double; the block-bottom anchor has no length of
    /// its own to double and falls back to one viewport height.
    pub fn doubled(&self) -> ScrollDistance {
        match self {
            ScrollDistance::ViewportPercent(pct) => ScrollDistance::ViewportPercent(pct * 2.0),
            ScrollDistance::Pixels(px) => ScrollDistance::Pixels(px * 2.0),
            ScrollDistance::BlockBottom => ScrollDistance::ViewportPercent(100.0),
        }
    }

    fn clamped(self) -> ScrollDistance {
        let fix = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        match self {
            ScrollDistance::ViewportPercent(pct) => ScrollDistance::ViewportPercent(fix(pct)),
            ScrollDistance::Pixels(px) => ScrollDistance::Pixels(fix(px)),
            ScrollDistance::BlockBottom => ScrollDistance::BlockBottom,
        }
    }
}

impl FromStr for ScrollDistance {
    type Err = RevealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.split_whitespace().eq(["bottom", "bottom"]) {
            return Ok(ScrollDistance::BlockBottom);
        }

        let invalid = || RevealError::InvalidDistance(s.to_string());
        let amount = trimmed.strip_prefix("+=").ok_or_else(invalid)?.trim();

        if let Some(pct) = amount.strip_suffix('%') {
            let pct: f64 = pct.trim().parse().map_err(|_| invalid())?;
            return Ok(ScrollDistance::ViewportPercent(pct));
        }
        let px = amount.strip_suffix("px").unwrap_or(amount);
        let px: f64 = px.trim().parse().map_err(|_| invalid())?;
        Ok(ScrollDistance::Pixels(px))
    }
}

impl fmt::Display for ScrollDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollDistance::ViewportPercent(pct) => write!(f, "+={pct}%"),
            ScrollDistance::Pixels(px) => write!(f, "+={px}px"),
            ScrollDistance::BlockBottom => f.write_str("bottom bottom"),
        }
    }
}

impl Serialize for ScrollDistance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScrollDistance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied settings for one revealed block.
///
/// Deserialization never fails on bad values: unparsable distances fall back
/// to their defaults and numbers are clamped by [`RevealConfig::sanitized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Opacity of a word before it is revealed and after it disappears.
    pub base_opacity: f64,
    /// Resting rotation of the whole block. Zero disables rotation.
    pub base_rotation_deg: f64,
    /// Blur of a word before it is revealed and after it disappears.
    pub blur_strength_px: f64,
    pub enable_blur: bool,
    #[serde(deserialize_with = "lenient_reveal_end")]
    pub reveal_end: ScrollDistance,
    /// Length of the disappear window. Derived from `reveal_end` when unset.
    #[serde(deserialize_with = "lenient_disappear_end")]
    pub disappear_end: Option<ScrollDistance>,
    /// Progress units between consecutive words starting to reveal.
    pub stagger_step: f64,
}

pub const DEFAULT_STAGGER_STEP: f64 = 0.05;

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            base_opacity: 0.1,
            base_rotation_deg: 3.0,
            blur_strength_px: 4.0,
            enable_blur: true,
            reveal_end: ScrollDistance::BlockBottom,
            disappear_end: None,
            stagger_step: DEFAULT_STAGGER_STEP,
        }
    }
}

impl RevealConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    pub fn disappear_distance(&self) -> ScrollDistance {
        self.disappear_end.unwrap_or_else(|| self.reveal_end.doubled())
    }

    /// Clamp every numeric field into its valid range.
    pub fn sanitized(mut self) -> Self {
        let base_opacity = if self.base_opacity.is_nan() {
            Self::default().base_opacity
        } else {
            self.base_opacity.clamp(0.0, 1.0)
        };
        if base_opacity != self.base_opacity {
            warn!(value = self.base_opacity, clamped = base_opacity, "base_opacity out of range");
            self.base_opacity = base_opacity;
        }

        if !self.base_rotation_deg.is_finite() {
            warn!(value = self.base_rotation_deg, "base_rotation_deg is not finite, using 0");
            self.base_rotation_deg = 0.0;
        }

        let blur = if self.blur_strength_px.is_finite() {
            self.blur_strength_px.max(0.0)
        } else {
            0.0
        };
        if blur != self.blur_strength_px {
            warn!(value = self.blur_strength_px, clamped = blur, "blur_strength_px out of range");
            self.blur_strength_px = blur;
        }

        let stagger = if self.stagger_step.is_finite() {
            self.stagger_step.max(0.0)
        } else {
            DEFAULT_STAGGER_STEP
        };
        if stagger != self.stagger_step {
            warn!(value = self.stagger_step, clamped = stagger, "stagger_step out of range");
            self.stagger_step = stagger;
        }

        self.reveal_end = self.reveal_end.clamped();
        self.disappear_end = self.disappear_end.map(ScrollDistance::clamped);
        self
    }
}

fn lenient_reveal_end<'de, D: Deserializer<'de>>(d: D) -> Result<ScrollDistance, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(raw.parse().unwrap_or_else(|err: RevealError| {
        warn!(%err, "using default reveal_end");
        ScrollDistance::default()
    }))
}

fn lenient_disappear_end<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<ScrollDistance>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|raw| match raw.parse() {
        Ok(distance) => Some(distance),
        Err(err) => {
            warn!(%err, "deriving disappear_end from reveal_end");
            None
        }
    }))
}
