use serde::{Deserialize, Serialize};

/// Snapshot of a scroll container: how far it is scrolled and how tall its
/// visible area is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub offset: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(offset: f64, viewport_height: f64) -> Self {
        Self {
            offset,
            viewport_height,
        }
    }

    /// Offset of the viewport's bottom edge in content coordinates.
    pub fn bottom(&self) -> f64 {
        self.offset + self.viewport_height
    }
}

/// Vertical placement of a text block inside the scroll container's content.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockGeometry {
    pub top: f64,
    pub height: f64,
}

impl BlockGeometry {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// A block with no extent (not laid out yet, or detached from the
    /// document) cannot anchor any scroll window.
    pub fn is_measurable(&self) -> bool {
        self.top.is_finite() && self.height.is_finite() && self.height > 0.0
    }
}

/// Computed visual state of a single word unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordStyle {
    pub opacity: f64,
    pub blur_px: Option<f64>,
}
