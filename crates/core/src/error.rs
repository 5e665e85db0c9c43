use thiserror::Error;

/// Everything that can go wrong inside the reveal engine.
///
/// None of these ever reach the host page as a failure: the engine logs
/// them and falls back to showing the text unrevealed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RevealError {
    #[error("block has no layout extent")]
    Unmeasurable,
    #[error("invalid scroll distance {0:?} (expected \"+=N%\", \"+=Npx\" or \"bottom bottom\")")]
    InvalidDistance(String),
    #[error("engine handle is detached")]
    Detached,
}
