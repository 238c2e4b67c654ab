//! Parallax Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by every Parallax crate:
//! - Identifiers (EntityId, TransitionId)
//! - View levels, entity references and level keys
//! - Frame time primitives
//! - Transition phases and their legal successions
//! - Error types

pub mod error;
pub mod id;
pub mod level;
pub mod phase;
pub mod time;

pub use error::*;
pub use id::*;
pub use level::*;
pub use phase::*;
pub use time::*;
