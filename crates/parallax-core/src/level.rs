//! View levels and the references that live inside them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Nested detail scope the viewer can drill into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ViewLevel {
    /// Whole-map view (e.g. the galaxy)
    #[default]
    Overview,
    /// One system within the overview
    Mid,
    /// One body or station within a system
    Detail,
}

impl ViewLevel {
    /// All levels, outermost first
    pub fn all() -> &'static [ViewLevel] {
        &[ViewLevel::Overview, ViewLevel::Mid, ViewLevel::Detail]
    }

    /// Nesting depth (Overview = 0)
    #[inline]
    pub fn depth(self) -> u8 {
        match self {
            ViewLevel::Overview => 0,
            ViewLevel::Mid => 1,
            ViewLevel::Detail => 2,
        }
    }

    /// Next level inward, if any
    pub fn child(self) -> Option<ViewLevel> {
        match self {
            ViewLevel::Overview => Some(ViewLevel::Mid),
            ViewLevel::Mid => Some(ViewLevel::Detail),
            ViewLevel::Detail => None,
        }
    }

    /// Next level outward, if any
    pub fn parent(self) -> Option<ViewLevel> {
        match self {
            ViewLevel::Overview => None,
            ViewLevel::Mid => Some(ViewLevel::Overview),
            ViewLevel::Detail => Some(ViewLevel::Mid),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewLevel::Overview => "overview",
            ViewLevel::Mid => "mid",
            ViewLevel::Detail => "detail",
        }
    }
}

impl fmt::Display for ViewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a selectable entity, tagged with the level it belongs to.
///
/// Carries no behavior; the data source resolves it against level data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub level: ViewLevel,
}

impl EntityRef {
    pub fn new(id: impl Into<EntityId>, level: ViewLevel) -> Self {
        EntityRef {
            id: id.into(),
            level,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.level)
    }
}

/// Identity of one level-instance: a level plus the entity it is focused on.
///
/// `LevelKey { level: Mid, focus: Some("sol") }` is the system view of `sol`.
/// The overview has no focus.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelKey {
    pub level: ViewLevel,
    pub focus: Option<EntityId>,
}

impl LevelKey {
    pub fn new(level: ViewLevel, focus: Option<EntityId>) -> Self {
        LevelKey { level, focus }
    }

    pub fn overview() -> Self {
        LevelKey::new(ViewLevel::Overview, None)
    }

    /// Key for the level a transition targets
    pub fn for_target(level: ViewLevel, entity: Option<&EntityRef>) -> Self {
        LevelKey::new(level, entity.map(|e| e.id.clone()))
    }
}

impl Default for LevelKey {
    fn default() -> Self {
        LevelKey::overview()
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.focus {
            Some(focus) => write!(f, "{}:{}", self.level, focus),
            None => write!(f, "{}", self.level),
        }
    }
}
