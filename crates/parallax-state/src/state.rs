//! Scene state - the record every observer reads

use std::sync::Arc;

use parallax_core::{EntityRef, LevelKey, TransitionPhase, ViewLevel};
use parallax_visual::CameraPose;
use serde::Serialize;
use tokio::time::Instant;

/// Progressive text reveal state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevealState {
    /// Full text being revealed
    pub source_text: Arc<str>,
    /// Revealed share of `source_text`, in [0, 1]
    pub revealed_fraction: f32,
    /// Whether a reveal is advancing
    pub active: bool,
}

impl Default for RevealState {
    fn default() -> Self {
        RevealState {
            source_text: Arc::from(""),
            revealed_fraction: 0.0,
            active: false,
        }
    }
}

impl RevealState {
    /// Number of characters currently visible
    pub fn visible_chars(&self) -> usize {
        let total = self.source_text.chars().count();
        ((total as f64) * self.revealed_fraction as f64).floor() as usize
    }

    /// The visible prefix of `source_text`
    pub fn visible_text(&self) -> &str {
        let n = self.visible_chars();
        match self.source_text.char_indices().nth(n) {
            Some((idx, _)) => &self.source_text[..idx],
            None => &self.source_text,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.revealed_fraction >= 1.0
    }
}

/// Transition admission guard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransitionGuard {
    pub in_progress: bool,
    #[serde(skip)]
    pub last_started_at: Option<Instant>,
}

impl TransitionGuard {
    /// Guard for a transition admitted at `now`
    pub fn started(now: Instant) -> Self {
        TransitionGuard {
            in_progress: true,
            last_started_at: Some(now),
        }
    }

    /// Same guard with the in-flight flag cleared; the start time is kept
    /// for debouncing.
    pub fn released(self) -> Self {
        TransitionGuard {
            in_progress: false,
            ..self
        }
    }
}

/// Snapshot of the whole scene
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneState {
    pub view_level: ViewLevel,
    /// Level instance currently mounted
    pub level_key: LevelKey,
    pub selection: Option<EntityRef>,
    pub camera_pose: CameraPose,
    pub reveal: RevealState,
    pub transition_phase: TransitionPhase,
    pub guard: TransitionGuard,
    /// Number of batches applied so far
    pub revision: u64,
}

impl Default for SceneState {
    fn default() -> Self {
        SceneState {
            view_level: ViewLevel::Overview,
            level_key: LevelKey::overview(),
            selection: None,
            camera_pose: CameraPose::default(),
            reveal: RevealState::default(),
            transition_phase: TransitionPhase::Idle,
            guard: TransitionGuard::default(),
            revision: 0,
        }
    }
}

impl SceneState {
    pub fn is_idle(&self) -> bool {
        self.transition_phase.is_idle()
    }
}

/// A partial update, applied atomically by [`crate::SceneStore::set`].
///
/// Unset fields are left untouched. Setting `reveal_text` starts a new
/// reveal: the fraction restarts at 0 unless the same patch sets it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenePatch {
    pub view_level: Option<ViewLevel>,
    pub level_key: Option<LevelKey>,
    pub selection: Option<Option<EntityRef>>,
    pub camera_pose: Option<CameraPose>,
    pub reveal_text: Option<Arc<str>>,
    pub reveal_fraction: Option<f32>,
    pub reveal_active: Option<bool>,
    pub phase: Option<TransitionPhase>,
    pub guard: Option<TransitionGuard>,
}

impl ScenePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_level(mut self, level: ViewLevel) -> Self {
        self.view_level = Some(level);
        self
    }

    pub fn level_key(mut self, key: LevelKey) -> Self {
        self.level_key = Some(key);
        self
    }

    pub fn selection(mut self, selection: Option<EntityRef>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn camera_pose(mut self, pose: CameraPose) -> Self {
        self.camera_pose = Some(pose);
        self
    }

    pub fn reveal_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.reveal_text = Some(text.into());
        self
    }

    pub fn reveal_fraction(mut self, fraction: f32) -> Self {
        self.reveal_fraction = Some(fraction);
        self
    }

    pub fn reveal_active(mut self, active: bool) -> Self {
        self.reveal_active = Some(active);
        self
    }

    pub fn phase(mut self, phase: TransitionPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn guard(mut self, guard: TransitionGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == ScenePatch::default()
    }
}
