//! Parallax Reveal - progressive text reveal on the render tick
//!
//! The description of the current selection is revealed a few characters
//! per frame. Progress is a function of accumulated tick time, never of a
//! timer of its own, so it stays in step with the camera.

pub mod config;
pub mod controller;

pub use config::*;
pub use controller::*;
