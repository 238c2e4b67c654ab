//! Parallax Time - the single source of time-dependent progress
//!
//! This crate implements the render tick:
//! - Frame clock: clamped per-frame elapsed time on a pausable monotonic clock
//! - Tick scheduler: ordered, non-re-entrant callback dispatch
//! - Tick driver: the async loop that fires ticks at the display rate and
//!   suspends while nothing is registered
//! - Completion signals: one-shot notifications that never stay pending

pub mod clock;
pub mod driver;
pub mod scheduler;
pub mod signal;

pub use clock::*;
pub use driver::*;
pub use scheduler::*;
pub use signal::*;
