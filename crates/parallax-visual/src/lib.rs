//! Parallax Visual - camera motion as interpolated state
//!
//! The camera is not moved by a tween library running on its own timer.
//! A camera move is an [`AnimationTask`]: start pose, end pose, duration and
//! easing, advanced only by the render tick and reporting its end through a
//! completion signal.
//!
//! - [`pose`]: positions, rotations and the camera pose, all interpolable
//! - [`easing`]: easing curves
//! - [`animation`]: tick-driven animation tasks

pub mod animation;
pub mod easing;
pub mod pose;

pub use animation::*;
pub use easing::*;
pub use pose::*;
