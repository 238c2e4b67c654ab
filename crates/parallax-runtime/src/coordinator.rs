//! Transition coordinator - the phase state machine
//!
//! ```text
//! Idle → Prefetching → Selecting → AnimatingIn → Swapping → SettlingIn → Resetting → Idle
//! ```
//!
//! At most one transition is in flight. Whatever way a transition ends
//! (success, failure, external abort, or its future being dropped) the
//! reset step runs: an uncommitted transition rolls the selection and reveal
//! back and stops the camera, then the phase goes through Resetting to Idle
//! and the guard is released.

use std::sync::Arc;
use std::time::Duration;

use parallax_core::{EntityRef, LevelKey, SourceError, TransitionId, TransitionPhase, ViewLevel};
use parallax_reveal::{RevealController, RevealHandle, RevealStatus};
use parallax_state::{RevealState, ScenePatch, SceneStore, TransitionGuard};
use parallax_time::CompletionSignal;
use parallax_visual::AnimationSignal;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::{CameraRig, LevelSource, SceneHost, TransitionConfig};

/// A request to move the viewer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    pub target_level: ViewLevel,
    pub target_entity: Option<EntityRef>,
    /// Keep the target entity selected after the swap
    pub carry_selection: bool,
}

impl TransitionRequest {
    pub fn new(target_level: ViewLevel, target_entity: Option<EntityRef>) -> Self {
        TransitionRequest {
            target_level,
            target_entity,
            carry_selection: false,
        }
    }

    pub fn carry_selection(mut self) -> Self {
        self.carry_selection = true;
        self
    }

    /// Key of the level instance this request needs
    pub fn level_key(&self) -> LevelKey {
        LevelKey::for_target(self.target_level, self.target_entity.as_ref())
    }
}

/// Why a request was refused without touching any state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Another transition is running
    InFlight,
    /// The previous transition started less than the debounce window ago
    Debounced,
}

/// Why an admitted transition stopped early
#[derive(Clone, Debug, PartialEq)]
pub enum AbortCause {
    /// The level data could not be loaded
    Prefetch(SourceError),
    /// The target entity is not part of the loaded level
    UnresolvedEntity(EntityRef),
    /// The camera move could not run or was cancelled
    Animation,
    /// [`TransitionCoordinator::abort`] was called, or the store was moved
    /// out from under the transition
    External,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransitionOutcome {
    Success,
    Aborted(AbortCause),
    Rejected(RejectReason),
}

impl TransitionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionOutcome::Success)
    }
}

/// Running totals
#[derive(Clone, Debug, Default)]
pub struct TransitionStats {
    pub admitted: u64,
    pub succeeded: u64,
    pub aborted: u64,
    pub rejected: u64,
    /// Transitions whose future was dropped mid-flight
    pub dropped: u64,
    /// AnimatingIn waits cut short by the timeout
    pub animate_timeouts: u64,
    /// SettlingIn waits cut short by the timeout
    pub settle_timeouts: u64,
    pub last_duration: Option<Duration>,
}

struct InFlight {
    id: TransitionId,
    abort: watch::Sender<bool>,
}

#[derive(Default)]
struct CoordinatorInner {
    last_id: TransitionId,
    current: Option<InFlight>,
    stats: TransitionStats,
}

/// Drives view transitions
#[derive(Clone)]
pub struct TransitionCoordinator {
    store: SceneStore,
    reveal: RevealController,
    camera: CameraRig,
    source: Arc<dyn LevelSource>,
    host: Arc<dyn SceneHost>,
    config: TransitionConfig,
    inner: Arc<Mutex<CoordinatorInner>>,
}

impl TransitionCoordinator {
    pub fn new(
        store: SceneStore,
        reveal: RevealController,
        camera: CameraRig,
        source: Arc<dyn LevelSource>,
        host: Arc<dyn SceneHost>,
        config: TransitionConfig,
    ) -> Self {
        TransitionCoordinator {
            store,
            reveal,
            camera,
            source,
            host,
            config,
            inner: Arc::new(Mutex::new(CoordinatorInner::default())),
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Move to `target_level`, focused on `target_entity`
    pub async fn request_transition(
        &self,
        target_level: ViewLevel,
        target_entity: Option<EntityRef>,
    ) -> TransitionOutcome {
        self.request(TransitionRequest::new(target_level, target_entity))
            .await
    }

    /// Run one transition to its end. Never fails; the outcome says how it
    /// ended. Dropping the future aborts the transition and still resets.
    pub async fn request(&self, request: TransitionRequest) -> TransitionOutcome {
        let (id, abort_rx) = match self.admit() {
            Ok(admitted) => admitted,
            Err(reason) => {
                self.inner.lock().stats.rejected += 1;
                tracing::debug!(?reason, target = %request.target_level, "transition rejected");
                return TransitionOutcome::Rejected(reason);
            }
        };

        tracing::info!(
            id = %id,
            target = %request.target_level,
            entity = ?request.target_entity.as_ref().map(|e| e.id.as_str()),
            "transition started"
        );

        let prior = self.store.get();
        let mut scope = TransitionScope {
            coordinator: self,
            id,
            started: Instant::now(),
            prior_selection: prior.selection,
            prior_reveal: prior.reveal,
            committed: false,
            settled: false,
        };

        let outcome = self.run(&mut scope, &request, abort_rx).await;
        scope.settled = true;
        self.record(&outcome, scope.started.elapsed());
        match &outcome {
            TransitionOutcome::Success => tracing::info!(id = %id, "transition complete"),
            TransitionOutcome::Aborted(cause) => {
                tracing::warn!(id = %id, ?cause, committed = scope.committed, "transition aborted")
            }
            TransitionOutcome::Rejected(_) => {}
        }
        outcome
    }

    /// Abort the transition in flight. Returns false if there is none.
    pub fn abort(&self) -> bool {
        match &self.inner.lock().current {
            Some(in_flight) => {
                let phase = self.store.phase();
                tracing::debug!(
                    id = %in_flight.id,
                    %phase,
                    committed = phase.is_committed(),
                    "transition abort requested"
                );
                in_flight.abort.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// The renderer tore the scene down: stop the camera. A transition
    /// still waiting on the camera aborts.
    pub fn scene_disposed(&self) {
        if self.camera.cancel() {
            tracing::debug!("camera move cancelled by scene disposal");
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.lock().current.is_some()
    }

    pub fn stats(&self) -> TransitionStats {
        self.inner.lock().stats.clone()
    }

    /// Guard check and the move to Prefetching. The slot in `inner` is
    /// claimed before the store is touched, so two admissions cannot both
    /// pass the check.
    fn admit(&self) -> Result<(TransitionId, watch::Receiver<bool>), RejectReason> {
        let now = Instant::now();
        let (abort, abort_rx) = watch::channel(false);
        let id = {
            let mut inner = self.inner.lock();
            let state = self.store.get();

            if inner.current.is_some() || state.guard.in_progress || !state.is_idle() {
                return Err(RejectReason::InFlight);
            }
            if let Some(last) = state.guard.last_started_at {
                if now.saturating_duration_since(last) < self.config.debounce {
                    return Err(RejectReason::Debounced);
                }
            }

            let id = inner.last_id.next();
            inner.last_id = id;
            inner.current = Some(InFlight { id, abort });
            id
        };

        if let Err(err) = self.store.set(
            ScenePatch::new()
                .phase(TransitionPhase::Prefetching)
                .guard(TransitionGuard::started(now)),
        ) {
            tracing::warn!(%err, "transition admission refused by store");
            self.inner.lock().current = None;
            return Err(RejectReason::InFlight);
        }

        self.inner.lock().stats.admitted += 1;
        Ok((id, abort_rx))
    }

    async fn run(
        &self,
        scope: &mut TransitionScope<'_>,
        request: &TransitionRequest,
        mut abort_rx: watch::Receiver<bool>,
    ) -> TransitionOutcome {
        // Prefetching
        let key = request.level_key();
        let fetched = tokio::select! {
            biased;
            _ = aborted(&mut abort_rx) => return aborted_externally(),
            result = self.source.load_level(&key) => result,
        };
        let data = match fetched {
            Ok(data) => Arc::new(data),
            Err(err) => {
                tracing::warn!(level = %key, %err, "level prefetch failed");
                return TransitionOutcome::Aborted(AbortCause::Prefetch(err));
            }
        };
        let record = match &request.target_entity {
            Some(entity) => match data.resolve(entity) {
                Ok(record) => Some(record.clone()),
                Err(err) => {
                    tracing::warn!(level = %key, %err, "target entity unresolved");
                    return TransitionOutcome::Aborted(AbortCause::UnresolvedEntity(entity.clone()));
                }
            },
            None => None,
        };

        // Selecting
        if let Err(outcome) = self.enter(
            ScenePatch::new()
                .phase(TransitionPhase::Selecting)
                .selection(request.target_entity.clone()),
        ) {
            return outcome;
        }
        let reveal = match &record {
            Some(record) => match self.reveal.start(&record.description, None) {
                Ok(handle) => handle,
                Err(err) => {
                    tracing::warn!(%err, "reveal could not start");
                    return TransitionOutcome::Aborted(AbortCause::Animation);
                }
            },
            None => {
                self.reveal.cancel();
                CompletionSignal::resolved(RevealStatus::Completed)
            }
        };
        let target_pose = record
            .as_ref()
            .map_or(data.home_pose, |record| record.approach_pose);
        let camera = match self.camera.move_to(
            target_pose,
            self.config.camera_duration,
            self.config.camera_easing,
        ) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!(%err, "camera move could not start");
                return TransitionOutcome::Aborted(AbortCause::Animation);
            }
        };

        // AnimatingIn
        if let Err(outcome) = self.enter(ScenePatch::new().phase(TransitionPhase::AnimatingIn)) {
            return outcome;
        }
        if let Err(outcome) = self.animate_in(camera, reveal, &mut abort_rx).await {
            return outcome;
        }

        // Swapping
        if *abort_rx.borrow() {
            return aborted_externally();
        }
        let selection = if request.carry_selection {
            request.target_entity.clone()
        } else {
            None
        };
        if let Err(outcome) = self.enter(
            ScenePatch::new()
                .phase(TransitionPhase::Swapping)
                .view_level(request.target_level)
                .level_key(key.clone())
                .selection(selection),
        ) {
            return outcome;
        }
        scope.committed = true;
        self.host.mount_scene(&key, data);

        // SettlingIn
        if let Err(outcome) = self.enter(ScenePatch::new().phase(TransitionPhase::SettlingIn)) {
            return outcome;
        }
        let ready = self.host.report_ready();
        tokio::select! {
            biased;
            _ = aborted(&mut abort_rx) => return aborted_externally(),
            signal = ready => {
                if signal.is_none() {
                    tracing::debug!(level = %key, "scene ready signal dropped");
                }
            }
            _ = tokio::time::sleep(self.config.settle_timeout) => {
                self.inner.lock().stats.settle_timeouts += 1;
                tracing::warn!(level = %key, timeout = ?self.config.settle_timeout, "scene not ready in time, settling anyway");
            }
        }

        TransitionOutcome::Success
    }

    /// Wait for camera and reveal, bounded by the animate timeout
    async fn animate_in(
        &self,
        mut camera: AnimationSignal,
        mut reveal: RevealHandle,
        abort_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), TransitionOutcome> {
        let deadline = tokio::time::sleep(self.config.animate_timeout);
        tokio::pin!(deadline);

        while !(camera.is_terminated() && reveal.is_terminated()) {
            tokio::select! {
                biased;
                _ = aborted(abort_rx) => return Err(aborted_externally()),
                status = &mut camera, if !camera.is_terminated() => {
                    match status {
                        Some(status) if status.reached_end() => {}
                        _ => {
                            tracing::warn!(?status, "camera move did not reach its target");
                            return Err(TransitionOutcome::Aborted(AbortCause::Animation));
                        }
                    }
                }
                status = &mut reveal, if !reveal.is_terminated() => {
                    if status != Some(RevealStatus::Completed) {
                        tracing::debug!(?status, "reveal ended early");
                    }
                }
                _ = &mut deadline => {
                    self.inner.lock().stats.animate_timeouts += 1;
                    tracing::warn!(
                        timeout = ?self.config.animate_timeout,
                        camera_done = camera.is_terminated(),
                        reveal_done = reveal.is_terminated(),
                        "animation did not finish in time, proceeding"
                    );
                    self.reveal.finish();
                    self.camera.finish();
                    break;
                }
            }
        }
        Ok(())
    }

    /// Apply a phase patch; a refusal means something else moved the phase
    fn enter(&self, patch: ScenePatch) -> Result<(), TransitionOutcome> {
        self.store.set(patch).map(|_| ()).map_err(|err| {
            tracing::warn!(%err, "transition phase refused");
            aborted_externally()
        })
    }

    fn record(&self, outcome: &TransitionOutcome, elapsed: Duration) {
        let mut inner = self.inner.lock();
        match outcome {
            TransitionOutcome::Success => inner.stats.succeeded += 1,
            TransitionOutcome::Aborted(_) => inner.stats.aborted += 1,
            TransitionOutcome::Rejected(_) => inner.stats.rejected += 1,
        }
        inner.stats.last_duration = Some(elapsed);
    }

    /// The reset step
    fn reset(&self, scope: &TransitionScope<'_>) {
        let mut resetting = ScenePatch::new().phase(TransitionPhase::Resetting);
        if !scope.committed {
            self.reveal.cancel();
            self.camera.cancel();
            resetting = resetting
                .selection(scope.prior_selection.clone())
                .reveal_text(scope.prior_reveal.source_text.clone())
                .reveal_fraction(scope.prior_reveal.revealed_fraction)
                .reveal_active(false);
        }

        if !self.store.phase().can_move_to(TransitionPhase::Resetting) {
            // Forced to Idle from outside; only the rollback is left to do
            resetting.phase = None;
        }
        if let Err(err) = self.store.set(resetting) {
            tracing::warn!(%err, "reset step refused");
        }
        let released = self.store.get().guard.released();
        if let Err(err) = self
            .store
            .set(ScenePatch::new().phase(TransitionPhase::Idle).guard(released))
        {
            tracing::warn!(%err, "return to idle refused");
        }

        let mut inner = self.inner.lock();
        if inner.current.as_ref().map(|c| c.id) == Some(scope.id) {
            inner.current = None;
        }
        if !scope.settled {
            inner.stats.dropped += 1;
            inner.stats.aborted += 1;
        }
    }
}

impl std::fmt::Debug for TransitionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionCoordinator")
            .field("config", &self.config)
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

/// Runs the reset step when the transition ends or its future is dropped
struct TransitionScope<'a> {
    coordinator: &'a TransitionCoordinator,
    id: TransitionId,
    started: Instant,
    prior_selection: Option<EntityRef>,
    prior_reveal: RevealState,
    /// The view level has been swapped; nothing is rolled back past this
    committed: bool,
    /// `request` saw the outcome
    settled: bool,
}

impl Drop for TransitionScope<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(id = %self.id, "transition dropped mid-flight");
        }
        self.coordinator.reset(self);
    }
}

fn aborted_externally() -> TransitionOutcome {
    TransitionOutcome::Aborted(AbortCause::External)
}

/// Resolves once the abort flag is raised
async fn aborted(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
