//! Scroll-linked text reveal.
//!
//! ```text
//!   text ──▶ tokenizer ──▶ WordUnits ──────┐
//!                                          ├──▶ style ──▶ StyleCommand[] ──▶ StyleSink
//!   ScrollSource ──▶ progress ──▶ windows ─┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod source;
pub mod style;
pub mod tokenizer;
pub mod trigger;
pub mod window;

pub use config::{RevealConfig, ScrollDistance};
pub use engine::{EngineHandle, EngineHost, Phase, WordUnit, attach};
pub use error::RevealError;
pub use scheduler::{Scheduler, TimerQueue};
pub use source::{BlockMeasure, LayoutSlot, RecordingSink, ScrollSource, ScrollViewport, StyleSink};
pub use trigger::{OneShot, VisibilityWatch};
