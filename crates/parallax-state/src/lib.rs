//! Parallax State - the single observable record of the view
//!
//! This crate implements the Scene State Store:
//! - Scene state: view level, selection, camera pose, reveal, phase, guard
//! - Patches: partial updates applied as one batch
//! - Invariants: legal phase moves, level changes only while swapping,
//!   monotonic reveal progress
//! - Observation: listener subscriptions and bounded state feeds

pub mod feed;
pub mod state;
pub mod store;

pub use feed::*;
pub use state::*;
pub use store::*;
