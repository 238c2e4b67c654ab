//! Viewer - one fully wired transition core
//!
//! Owns the tick scheduler and its driver task, the scene store, the reveal
//! controller, the camera rig and the coordinator, all built from one
//! [`ViewerConfig`].

use std::sync::Arc;

use parallax_core::{EntityRef, ParallaxError, ParallaxResult, ViewLevel};
use parallax_reveal::{RevealController, RevealStatus};
use parallax_state::{SceneState, SceneStore, StateFeed, Subscription};
use parallax_time::{TickDriver, TickScheduler};
use tokio::task::JoinHandle;

use crate::{
    CameraRig, LevelSource, SceneHost, TransitionCoordinator, TransitionOutcome, TransitionRequest,
    ViewerConfig,
};

pub struct Viewer {
    scheduler: TickScheduler,
    store: SceneStore,
    reveal: RevealController,
    camera: CameraRig,
    coordinator: TransitionCoordinator,
    config: ViewerConfig,
    driver: Option<JoinHandle<()>>,
}

impl Viewer {
    pub fn new(
        source: Arc<dyn LevelSource>,
        host: Arc<dyn SceneHost>,
        config: ViewerConfig,
    ) -> Self {
        let scheduler = TickScheduler::new();
        let store = SceneStore::new();
        let reveal = RevealController::with_config(
            scheduler.clone(),
            store.clone(),
            config.transition.reveal.clone(),
        );
        let camera = CameraRig::new(scheduler.clone(), store.clone());
        let coordinator = TransitionCoordinator::new(
            store.clone(),
            reveal.clone(),
            camera.clone(),
            source,
            host,
            config.transition.clone(),
        );

        Viewer {
            scheduler,
            store,
            reveal,
            camera,
            coordinator,
            config,
            driver: None,
        }
    }

    /// Spawn the tick driver on the current tokio runtime. No-op if it is
    /// already running.
    pub fn start(&mut self) {
        if self.driver.is_some() {
            return;
        }
        let driver = TickDriver::with_config(self.scheduler.clone(), self.config.scheduler.clone());
        self.driver = Some(driver.spawn());
        tracing::debug!(interval = ?self.config.scheduler.frame_interval, "viewer started");
    }

    pub fn is_running(&self) -> bool {
        self.driver.as_ref().map_or(false, |d| !d.is_finished())
    }

    /// Abort any transition, stop the tick and wait for the driver to exit
    pub async fn shutdown(mut self) {
        self.coordinator.abort();
        self.scheduler.stop();
        if let Some(driver) = self.driver.take() {
            if let Err(err) = driver.await {
                tracing::warn!(%err, "tick driver ended abnormally");
            }
        }
    }

    pub async fn request_transition(
        &self,
        target_level: ViewLevel,
        target_entity: Option<EntityRef>,
    ) -> TransitionOutcome {
        self.coordinator
            .request_transition(target_level, target_entity)
            .await
    }

    pub async fn request(&self, request: TransitionRequest) -> TransitionOutcome {
        self.coordinator.request(request).await
    }

    /// Reveal `text` outside any transition (hover captions, tooltips) and
    /// wait for it to end. A newer reveal or a transition interrupts it.
    pub async fn reveal_text(&self, text: &str) -> ParallaxResult<RevealStatus> {
        let handle = self.reveal.start(text, None)?;
        handle.await.ok_or(ParallaxError::SignalDropped)
    }

    pub fn state(&self) -> SceneState {
        self.store.get()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SceneState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn feed(&self, capacity: usize) -> StateFeed {
        self.store.feed(capacity)
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn reveal(&self) -> &RevealController {
        &self.reveal
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn coordinator(&self) -> &TransitionCoordinator {
        &self.coordinator
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        // Lets a detached driver task exit
        self.scheduler.stop();
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("state", &self.store.get())
            .field("running", &self.is_running())
            .finish()
    }
}
