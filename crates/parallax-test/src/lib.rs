//! Parallax Test Harness - Scripted collaborators and transition scenarios
//!
//! This crate provides:
//! - Scripted level sources with latency and failure injection
//! - Recording scene hosts with controllable first paint
//! - A small star map fixture and a wired viewer harness
//! - Seeded input storms (click spam, aborts, scene disposal)
//! - End-to-end transition scenarios and invariant checks

pub mod fixtures;
pub mod harness;
pub mod integration;
pub mod storm;

pub use fixtures::*;
pub use harness::*;
pub use integration::*;
pub use storm::*;
