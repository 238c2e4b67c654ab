//! Scripted collaborators
//!
//! Stand-ins for the network and the renderer whose timing and failures
//! are set by the test:
//! - [`ScriptedLevelSource`]: fixed levels, per-load delay, injected failures,
//!   load and concurrency counters
//! - [`RecordingSceneHost`]: records every mount, reports ready at once,
//!   after a delay, or never

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parallax_core::{LevelKey, SourceError};
use parallax_runtime::{LevelData, LevelSource, SceneHost};
use parallax_time::{completion, Completer, CompletionSignal, ReadySignal};
use parking_lot::Mutex;

/// Level source with scripted latency and failures
#[derive(Debug, Default)]
pub struct ScriptedLevelSource {
    levels: Mutex<HashMap<LevelKey, LevelData>>,
    failures: Mutex<HashMap<LevelKey, SourceError>>,
    delay: Mutex<Duration>,
    loads: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
}

impl ScriptedLevelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(self, data: LevelData) -> Self {
        self.levels.lock().insert(data.key.clone(), data);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Make every load of `key` fail with `err`
    pub fn fail(&self, key: LevelKey, err: SourceError) {
        self.failures.lock().insert(key, err);
    }

    pub fn heal(&self, key: &LevelKey) {
        self.failures.lock().remove(key);
    }

    /// Loads started so far
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Highest number of loads that were running at once
    pub fn max_concurrent_loads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the load is cancelled
struct LoadGuard(Arc<AtomicUsize>);

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LevelSource for ScriptedLevelSource {
    async fn load_level(&self, key: &LevelKey) -> Result<LevelData, SourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = LoadGuard(self.in_flight.clone());

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failures.lock().get(key) {
            return Err(err.clone());
        }
        self.levels
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.clone()))
    }
}

/// When a mounted scene reports its first paint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyMode {
    Immediate,
    After(Duration),
    /// Never paints; the signal stays pending
    Never,
}

/// Scene host that records what it was asked to do
#[derive(Debug)]
pub struct RecordingSceneHost {
    mounts: Mutex<Vec<LevelKey>>,
    mode: Mutex<ReadyMode>,
    parked: Mutex<Vec<Completer<()>>>,
}

impl Default for RecordingSceneHost {
    fn default() -> Self {
        RecordingSceneHost {
            mounts: Mutex::new(Vec::new()),
            mode: Mutex::new(ReadyMode::Immediate),
            parked: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingSceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ready(self, mode: ReadyMode) -> Self {
        *self.mode.lock() = mode;
        self
    }

    pub fn mounts(&self) -> Vec<LevelKey> {
        self.mounts.lock().clone()
    }

    pub fn last_mount(&self) -> Option<LevelKey> {
        self.mounts.lock().last().cloned()
    }
}

impl SceneHost for RecordingSceneHost {
    fn mount_scene(&self, key: &LevelKey, _data: Arc<LevelData>) {
        self.mounts.lock().push(key.clone());
    }

    fn report_ready(&self) -> ReadySignal {
        match *self.mode.lock() {
            ReadyMode::Immediate => CompletionSignal::resolved(()),
            ReadyMode::After(delay) => {
                let (mut completer, signal) = completion();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    completer.complete(());
                });
                signal
            }
            ReadyMode::Never => {
                let (completer, signal) = completion();
                self.parked.lock().push(completer);
                signal
            }
        }
    }
}
