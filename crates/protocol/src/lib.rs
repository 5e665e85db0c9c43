pub mod commands;
pub mod types;

pub use commands::{Fragment, StyleCommand, TransformOrigin};
pub use types::{BlockGeometry, ScrollMetrics, WordStyle};
