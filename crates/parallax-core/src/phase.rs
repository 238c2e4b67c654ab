//! Transition phases
//!
//! A transition walks a fixed sequence:
//!
//! ```text
//! Idle → Prefetching → Selecting → AnimatingIn → Swapping → SettlingIn → Idle
//! ```
//!
//! Any active phase may be forced back to Idle (abort), or to Resetting,
//! the transient marker of the reset step, which is always followed by Idle.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransitionPhase {
    /// Resting state; the only state in which a new transition may start
    #[default]
    Idle,
    /// Level data is being fetched
    Prefetching,
    /// Selection applied, camera and reveal started
    Selecting,
    /// Waiting for camera and reveal to complete
    AnimatingIn,
    /// View level being replaced
    Swapping,
    /// Waiting for the new scene's first paint
    SettlingIn,
    /// Reset step; guard is cleared on the way to Idle
    Resetting,
}

impl TransitionPhase {
    /// The phase that follows this one in the fixed sequence
    pub fn successor(self) -> TransitionPhase {
        match self {
            TransitionPhase::Idle => TransitionPhase::Prefetching,
            TransitionPhase::Prefetching => TransitionPhase::Selecting,
            TransitionPhase::Selecting => TransitionPhase::AnimatingIn,
            TransitionPhase::AnimatingIn => TransitionPhase::Swapping,
            TransitionPhase::Swapping => TransitionPhase::SettlingIn,
            TransitionPhase::SettlingIn => TransitionPhase::Idle,
            TransitionPhase::Resetting => TransitionPhase::Idle,
        }
    }

    /// Whether a move from `self` to `next` is legal. Staying in the same
    /// phase is not a move, except for forcing Idle.
    pub fn can_move_to(self, next: TransitionPhase) -> bool {
        match next {
            TransitionPhase::Idle => true,
            TransitionPhase::Resetting => {
                !matches!(self, TransitionPhase::Idle | TransitionPhase::Resetting)
            }
            _ => self.successor() == next,
        }
    }

    #[inline]
    pub fn is_idle(self) -> bool {
        self == TransitionPhase::Idle
    }

    /// Whether the view level has already been replaced in this transition
    pub fn is_committed(self) -> bool {
        matches!(self, TransitionPhase::Swapping | TransitionPhase::SettlingIn)
    }

    pub fn name(self) -> &'static str {
        match self {
            TransitionPhase::Idle => "idle",
            TransitionPhase::Prefetching => "prefetching",
            TransitionPhase::Selecting => "selecting",
            TransitionPhase::AnimatingIn => "animating-in",
            TransitionPhase::Swapping => "swapping",
            TransitionPhase::SettlingIn => "settling-in",
            TransitionPhase::Resetting => "resetting",
        }
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
