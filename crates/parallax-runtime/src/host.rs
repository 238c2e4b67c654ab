//! Scene host - the renderer side of a level swap

use std::sync::Arc;

use parallax_core::LevelKey;
use parallax_time::{CompletionSignal, ReadySignal};
use parking_lot::Mutex;

use crate::LevelData;

/// Renderer hooks used during the swap and settle phases
pub trait SceneHost: Send + Sync {
    /// Replace the rendered scene with `data`
    fn mount_scene(&self, key: &LevelKey, data: Arc<LevelData>);

    /// Signal that fires once the scene mounted last has painted a frame
    fn report_ready(&self) -> ReadySignal;
}

/// Host without a renderer: every mounted scene is ready at once
#[derive(Debug, Default)]
pub struct HeadlessSceneHost {
    mounted: Mutex<Option<LevelKey>>,
}

impl HeadlessSceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the scene mounted last
    pub fn mounted(&self) -> Option<LevelKey> {
        self.mounted.lock().clone()
    }
}

impl SceneHost for HeadlessSceneHost {
    fn mount_scene(&self, key: &LevelKey, _data: Arc<LevelData>) {
        tracing::debug!(level = %key, "scene mounted");
        *self.mounted.lock() = Some(key.clone());
    }

    fn report_ready(&self) -> ReadySignal {
        CompletionSignal::resolved(())
    }
}
