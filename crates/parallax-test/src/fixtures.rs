//! A small star map used across the scenario tests
//!
//! ```text
//! overview ── sol ──┬── earth
//!           │       └── mars
//!           └── vega
//! ```

use std::sync::Arc;
use std::time::Duration;

use parallax_core::{EntityRef, LevelKey, ViewLevel};
use parallax_runtime::{EntityRecord, LevelData, Viewer, ViewerConfig};
use parallax_visual::{CameraPose, Position3D};

use crate::{RecordingSceneHost, ScriptedLevelSource};

/// Description of sol: exactly 90 characters
pub const SOL_DESCRIPTION: &str =
    "Sol, a G-type main-sequence star at the heart of the home system, with eight major planets";

pub fn sol() -> EntityRef {
    EntityRef::new("sol", ViewLevel::Mid)
}

pub fn vega() -> EntityRef {
    EntityRef::new("vega", ViewLevel::Mid)
}

pub fn earth() -> EntityRef {
    EntityRef::new("earth", ViewLevel::Detail)
}

/// Pose approaching a body at `distance` along +z
pub fn approach(x: f32, distance: f32) -> CameraPose {
    let target = Position3D::new(x, 0.0, 0.0);
    CameraPose::looking_at(Position3D::new(x, distance * 0.3, distance), target, 1.0)
}

/// Every level of the star map
pub fn star_map() -> Vec<LevelData> {
    let overview = LevelData::new(LevelKey::overview(), CameraPose::default());

    let mid_sol = LevelData::new(
        LevelKey::new(ViewLevel::Mid, Some("sol".into())),
        approach(0.0, 30.0),
    )
    .with_entity(EntityRecord::new("sol", "Sol", SOL_DESCRIPTION, approach(0.0, 12.0)));

    let mid_vega = LevelData::new(
        LevelKey::new(ViewLevel::Mid, Some("vega".into())),
        approach(40.0, 30.0),
    )
    .with_entity(EntityRecord::new(
        "vega",
        "Vega",
        "Bright, young and spinning fast.",
        approach(40.0, 10.0),
    ));

    let detail_earth = LevelData::new(
        LevelKey::new(ViewLevel::Detail, Some("earth".into())),
        approach(3.0, 6.0),
    )
    .with_entity(EntityRecord::new(
        "earth",
        "Earth",
        "Third planet. Mostly harmless.",
        approach(3.0, 2.0),
    ));

    vec![overview, mid_sol, mid_vega, detail_earth]
}

/// Source serving the star map after `delay`
pub fn star_map_source(delay: Duration) -> ScriptedLevelSource {
    star_map()
        .into_iter()
        .fold(ScriptedLevelSource::new(), |source, level| source.with_level(level))
        .with_delay(delay)
}

/// A viewer over the star map, plus handles to its scripted collaborators
pub struct Harness {
    pub viewer: Viewer,
    pub source: Arc<ScriptedLevelSource>,
    pub host: Arc<RecordingSceneHost>,
}

impl Harness {
    /// Viewer with a running tick driver
    pub fn started(config: ViewerConfig, delay: Duration) -> Self {
        let mut harness = Self::stalled(config, delay);
        harness.viewer.start();
        harness
    }

    /// Viewer whose tick driver never runs
    pub fn stalled(config: ViewerConfig, delay: Duration) -> Self {
        Self::with_host(config, delay, RecordingSceneHost::new())
    }

    pub fn with_host(config: ViewerConfig, delay: Duration, host: RecordingSceneHost) -> Self {
        let source = Arc::new(star_map_source(delay));
        let host = Arc::new(host);
        let viewer = Viewer::new(source.clone(), host.clone(), config);
        Harness {
            viewer,
            source,
            host,
        }
    }
}
