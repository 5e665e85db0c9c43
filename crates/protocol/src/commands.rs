use serde::{Deserialize, Serialize};

use crate::types::WordStyle;

/// A single, stateless style instruction.
///
/// The engine emits a `Vec<StyleCommand>` for every recompute. Hosts consume
/// the list sequentially and apply each command to the element it names;
/// every command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StyleCommand {
    /// Rotate the whole text block around `origin`.
    SetBlockRotation {
        degrees: f64,
        origin: TransformOrigin,
    },

    /// Set the visual state of one word unit, addressed by its ordinal
    /// among the word fragments of the block.
    SetWordStyle {
        index: u32,
        opacity: f64,
        /// `None` means no filter at all (blur disabled), which is not the
        /// same as `Some(0.0)`.
        blur_px: Option<f64>,
    },
}

impl StyleCommand {
    pub fn word(index: u32, style: WordStyle) -> Self {
        StyleCommand::SetWordStyle {
            index,
            opacity: style.opacity,
            blur_px: style.blur_px,
        }
    }

    /// The word index this command targets, if any.
    pub fn word_index(&self) -> Option<u32> {
        match self {
            StyleCommand::SetWordStyle { index, .. } => Some(*index),
            StyleCommand::SetBlockRotation { .. } => None,
        }
    }
}

/// Pivot of the block rotation, in percent of the block's box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformOrigin {
    pub x_percent: f64,
    pub y_percent: f64,
}

impl Default for TransformOrigin {
    /// Left edge, vertically centered.
    fn default() -> Self {
        Self {
            x_percent: 0.0,
            y_percent: 50.0,
        }
    }
}

/// One piece of the rendered block markup, in reading order.
///
/// Whitespace fragments are emitted verbatim so concatenating every
/// fragment's text reproduces the original input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Word { index: u32, text: String },
    Space { text: String },
}

impl Fragment {
    pub fn text(&self) -> &str {
        match self {
            Fragment::Word { text, .. } | Fragment::Space { text } => text,
        }
    }
}
