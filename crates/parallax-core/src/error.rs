//! Error types for Parallax

use thiserror::Error;

use crate::{EntityId, LevelKey, TransitionPhase, ViewLevel};

/// Tick scheduler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    #[error("Scheduler stopped")]
    Stopped,

    #[error("Re-entrant tick refused: tick {0} is still running")]
    Reentrant(u64),
}

/// Scene store mutation errors. The rejected patch is not applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Illegal phase move: {from} -> {to}")]
    IllegalPhase {
        from: TransitionPhase,
        to: TransitionPhase,
    },

    #[error("View level change {from} -> {to} outside swapping phase ({phase})")]
    LevelOutsideSwap {
        from: ViewLevel,
        to: ViewLevel,
        phase: TransitionPhase,
    },

    #[error("Reveal fraction regressed from {current} to {requested}")]
    RevealRegressed { current: f32, requested: f32 },
}

/// Level data source errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Level not found: {0}")]
    NotFound(LevelKey),

    #[error("Entity {entity} not present in level {level}")]
    UnknownEntity { level: LevelKey, entity: EntityId },

    #[error("Level data invalid: {0}")]
    Invalid(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Core Parallax errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParallaxError {
    #[error(transparent)]
    Tick(#[from] TickError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Completion signal dropped before resolving")]
    SignalDropped,
}

/// Result type for Parallax operations
pub type ParallaxResult<T> = Result<T, ParallaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::IllegalPhase {
            from: TransitionPhase::Idle,
            to: TransitionPhase::Swapping,
        };
        assert_eq!(err.to_string(), "Illegal phase move: idle -> swapping");

        let err: ParallaxError = SourceError::NotFound(LevelKey::overview()).into();
        assert_eq!(err.to_string(), "Level not found: overview");
    }
}
