//! Identity types for Parallax
//!
//! Entity identifiers are opaque strings supplied by the data source
//! ("sol", "sol/earth", "sol/earth/l5-station"). Transition identifiers are
//! process-local sequence numbers used for log correlation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Entity identity - opaque, resolved against level data by the data source
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Arc<str>);

impl EntityId {
    #[inline]
    pub fn new(id: impl AsRef<str>) -> Self {
        EntityId(Arc::from(id.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of a slash-separated id ("sol/earth" -> "earth")
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(Arc::from(s))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transition identity - monotonically increasing per coordinator
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TransitionId(pub u64);

impl TransitionId {
    pub const ZERO: TransitionId = TransitionId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        TransitionId(id)
    }

    #[inline]
    pub fn next(self) -> Self {
        TransitionId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transition(#{})", self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
