//! End-to-end transition tests
//!
//! Drive a full [`parallax_runtime::Viewer`] over the star map with scripted
//! collaborators and paused tokio time, and check what every observer of
//! the scene store saw:
//! - Single flight: never two transitions, never two loads at once
//! - Idle closure: every transition ends in Idle with the guard released
//! - No partial swap: the view level only changes in a Swapping batch
//! - Reveal monotonicity: an active reveal only moves forward

use std::sync::Arc;

use parallax_core::TransitionPhase;
use parallax_runtime::{TransitionOutcome, Viewer};
use parallax_state::{SceneState, Subscription};
use parking_lot::Mutex;

use crate::fixtures::Harness;
use crate::storm::{StormAction, StormEvent};

/// Every state published by a viewer's store, in batch order
pub struct StateRecorder {
    states: Arc<Mutex<Vec<SceneState>>>,
    _subscription: Subscription,
}

impl StateRecorder {
    pub fn attach(viewer: &Viewer) -> Self {
        let states = Arc::new(Mutex::new(vec![viewer.state()]));
        let sink = states.clone();
        let subscription = viewer.subscribe(move |state| sink.lock().push(state.clone()));
        StateRecorder {
            states,
            _subscription: subscription,
        }
    }

    pub fn states(&self) -> Vec<SceneState> {
        let mut states = self.states.lock().clone();
        states.sort_by_key(|s| s.revision);
        states
    }

    /// Number of transitions admitted (moves from Idle to Prefetching)
    pub fn admissions(&self) -> usize {
        self.states()
            .windows(2)
            .filter(|w| {
                w[0].transition_phase == TransitionPhase::Idle
                    && w[1].transition_phase == TransitionPhase::Prefetching
            })
            .count()
    }

    /// Check the observable invariants over the whole history
    pub fn verify(&self) -> Result<(), String> {
        let states = self.states();
        for pair in states.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);

            let moved = prev.transition_phase != next.transition_phase;
            if moved && !prev.transition_phase.can_move_to(next.transition_phase) {
                return Err(format!(
                    "illegal phase step {} -> {} at revision {}",
                    prev.transition_phase, next.transition_phase, next.revision
                ));
            }

            if prev.view_level != next.view_level
                && next.transition_phase != TransitionPhase::Swapping
            {
                return Err(format!(
                    "view level changed in phase {} at revision {}",
                    next.transition_phase, next.revision
                ));
            }

            let same_reveal = prev.reveal.active
                && next.reveal.active
                && prev.reveal.source_text == next.reveal.source_text;
            if same_reveal
                && next.reveal.revealed_fraction < prev.reveal.revealed_fraction
                && next.reveal.revealed_fraction != 0.0
            {
                return Err(format!(
                    "reveal regressed {} -> {} at revision {}",
                    prev.reveal.revealed_fraction, next.reveal.revealed_fraction, next.revision
                ));
            }

            if next.transition_phase == TransitionPhase::Prefetching
                && prev.transition_phase == TransitionPhase::Idle
                && prev.guard.in_progress
            {
                return Err(format!("admitted while guarded at revision {}", next.revision));
            }
        }

        match states.last() {
            Some(last) if !last.is_idle() || last.guard.in_progress => {
                Err(format!("did not return to idle: {:?}", last.transition_phase))
            }
            _ => Ok(()),
        }
    }
}

/// Play `events` against the harness, each request on its own task, and
/// collect every outcome
pub async fn run_storm(harness: &Harness, events: Vec<StormEvent>) -> Vec<TransitionOutcome> {
    let mut tasks = Vec::new();
    for event in events {
        tokio::time::sleep(event.after).await;
        let coordinator = harness.viewer.coordinator().clone();
        match event.action {
            StormAction::Request(request) => {
                tasks.push(tokio::spawn(async move { coordinator.request(request).await }));
            }
            StormAction::Abort => {
                coordinator.abort();
            }
            StormAction::DisposeScene => coordinator.scene_disposed(),
        }
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => tracing::warn!(%err, "storm request task failed"),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parallax_core::{LevelKey, SourceError, ViewLevel};
    use parallax_runtime::{AbortCause, RejectReason, TransitionRequest, ViewerConfig};
    use parallax_reveal::RevealStatus;
    use proptest::prelude::*;
    use tokio::time::Instant;

    use crate::fixtures::{sol, vega, SOL_DESCRIPTION};
    use crate::storm::{InputStorm, StormConfig};
    use crate::{ReadyMode, RecordingSceneHost};

    const FETCH: Duration = Duration::from_millis(50);

    fn mid_sol() -> LevelKey {
        LevelKey::new(ViewLevel::Mid, Some("sol".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_a_drill_into_sol() {
        let harness = Harness::started(ViewerConfig::default(), FETCH);
        let recorder = StateRecorder::attach(&harness.viewer);

        let outcome = harness
            .viewer
            .request_transition(ViewLevel::Mid, Some(sol()))
            .await;
        assert_eq!(outcome, TransitionOutcome::Success);

        let state = harness.viewer.state();
        assert_eq!(state.view_level, ViewLevel::Mid);
        assert_eq!(state.level_key, mid_sol());
        assert_eq!(state.reveal.visible_text(), SOL_DESCRIPTION);
        assert_eq!(harness.host.mounts(), vec![mid_sol()]);
        assert_eq!(harness.source.loads(), 1);

        // Every phase was visited in order
        let phases: Vec<TransitionPhase> = recorder
            .states()
            .iter()
            .map(|s| s.transition_phase)
            .fold(Vec::new(), |mut seen, phase| {
                if seen.last() != Some(&phase) {
                    seen.push(phase);
                }
                seen
            });
        assert_eq!(
            phases,
            vec![
                TransitionPhase::Idle,
                TransitionPhase::Prefetching,
                TransitionPhase::Selecting,
                TransitionPhase::AnimatingIn,
                TransitionPhase::Swapping,
                TransitionPhase::SettlingIn,
                TransitionPhase::Resetting,
                TransitionPhase::Idle,
            ]
        );
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_b_second_click_rejected() {
        let harness = Harness::started(ViewerConfig::default(), FETCH);
        let recorder = StateRecorder::attach(&harness.viewer);

        let coordinator = harness.viewer.coordinator().clone();
        let first = tokio::spawn(async move {
            coordinator
                .request_transition(ViewLevel::Mid, Some(sol()))
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = harness
            .viewer
            .request_transition(ViewLevel::Mid, Some(vega()))
            .await;
        assert_eq!(second, TransitionOutcome::Rejected(RejectReason::InFlight));
        assert_eq!(first.await.unwrap(), TransitionOutcome::Success);

        assert_eq!(harness.viewer.state().level_key, mid_sol());
        assert_eq!(harness.host.mounts(), vec![mid_sol()]);
        assert_eq!(harness.source.loads(), 1);
        assert_eq!(recorder.admissions(), 1);
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_c_prefetch_failure() {
        let harness = Harness::started(ViewerConfig::default(), FETCH);
        let recorder = StateRecorder::attach(&harness.viewer);
        harness
            .source
            .fail(mid_sol(), SourceError::Unavailable("server down".into()));

        let before = harness.viewer.state();
        let outcome = harness
            .viewer
            .request_transition(ViewLevel::Mid, Some(sol()))
            .await;
        assert_eq!(
            outcome,
            TransitionOutcome::Aborted(AbortCause::Prefetch(SourceError::Unavailable(
                "server down".into()
            )))
        );

        let after = harness.viewer.state();
        assert_eq!(after.view_level, before.view_level);
        assert_eq!(after.selection, before.selection);
        assert_eq!(after.camera_pose, before.camera_pose);
        assert!(after.is_idle());
        assert!(harness.host.mounts().is_empty());
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn abort_while_fetching_discards_the_level() {
        let harness = Harness::started(ViewerConfig::default(), Duration::from_millis(500));
        let recorder = StateRecorder::attach(&harness.viewer);
        let before = harness.viewer.state();

        let coordinator = harness.viewer.coordinator().clone();
        let request = tokio::spawn(async move {
            coordinator
                .request_transition(ViewLevel::Mid, Some(sol()))
                .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(harness.viewer.state().transition_phase, TransitionPhase::Prefetching);
        assert!(harness.viewer.coordinator().abort());
        assert_eq!(
            request.await.unwrap(),
            TransitionOutcome::Aborted(AbortCause::External)
        );

        // Well past the point the load would have resolved
        tokio::time::sleep(Duration::from_millis(600)).await;
        let after = harness.viewer.state();
        assert!(after.is_idle());
        assert!(!after.guard.in_progress);
        assert_eq!(after.view_level, before.view_level);
        assert_eq!(after.level_key, before.level_key);
        assert_eq!(after.selection, before.selection);
        assert!(harness.host.mounts().is_empty());
        assert!(harness.viewer.scheduler().is_empty());
        assert_eq!(harness.source.loads(), 1);
        assert!(!recorder
            .states()
            .iter()
            .any(|s| s.transition_phase == TransitionPhase::Selecting));
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_d_reveal_timing() {
        let harness = Harness::started(ViewerConfig::default(), FETCH);

        let start = Instant::now();
        let handle = harness.viewer.reveal().start(SOL_DESCRIPTION, None).unwrap();
        assert_eq!(handle.await, Some(RevealStatus::Completed));
        let elapsed = start.elapsed();

        // 90 chars at 66 chars/s is 1363.6 ms, rounded up to a whole frame
        assert!(
            elapsed >= Duration::from_millis(1340) && elapsed <= Duration::from_millis(1400),
            "reveal took {elapsed:?}"
        );
        let state = harness.viewer.state();
        assert_eq!(state.reveal.revealed_fraction, 1.0);
        assert!(!state.reveal.active);

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_e_stalled_animation_times_out() {
        // No tick driver: neither camera nor reveal can ever finish
        let harness = Harness::stalled(ViewerConfig::default(), FETCH);
        let recorder = StateRecorder::attach(&harness.viewer);

        let start = Instant::now();
        let outcome = harness
            .viewer
            .request_transition(ViewLevel::Mid, Some(sol()))
            .await;
        let elapsed = start.elapsed();

        assert_eq!(outcome, TransitionOutcome::Success);
        assert!(
            elapsed >= Duration::from_millis(3050) && elapsed < Duration::from_millis(3100),
            "transition took {elapsed:?}"
        );
        assert_eq!(harness.viewer.state().view_level, ViewLevel::Mid);
        assert_eq!(harness.viewer.coordinator().stats().animate_timeouts, 1);
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_first_paint() {
        let host = RecordingSceneHost::new().with_ready(ReadyMode::After(Duration::from_millis(120)));
        let mut harness = Harness::with_host(ViewerConfig::reduced_motion(), FETCH, host);
        harness.viewer.start();

        let outcome = harness
            .viewer
            .request_transition(ViewLevel::Overview, None)
            .await;
        assert!(outcome.is_success());
        assert_eq!(harness.viewer.coordinator().stats().settle_timeouts, 0);

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn settle_gives_up_on_a_scene_that_never_paints() {
        let host = RecordingSceneHost::new().with_ready(ReadyMode::Never);
        let mut harness = Harness::with_host(ViewerConfig::reduced_motion(), FETCH, host);
        harness.viewer.start();

        let outcome = harness
            .viewer
            .request_transition(ViewLevel::Mid, Some(sol()))
            .await;
        assert!(outcome.is_success());
        assert_eq!(harness.viewer.coordinator().stats().settle_timeouts, 1);
        assert!(harness.viewer.state().is_idle());

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_overview_mid_overview() {
        let harness = Harness::started(ViewerConfig::default(), FETCH);
        let recorder = StateRecorder::attach(&harness.viewer);
        let home = harness.viewer.state();

        assert!(harness
            .viewer
            .request(TransitionRequest::new(ViewLevel::Mid, Some(sol())).carry_selection())
            .await
            .is_success());
        assert_eq!(harness.viewer.state().selection, Some(sol()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(harness
            .viewer
            .request_transition(ViewLevel::Overview, None)
            .await
            .is_success());

        let state = harness.viewer.state();
        assert_eq!(state.view_level, home.view_level);
        assert_eq!(state.level_key, home.level_key);
        assert!(state.selection.is_none());
        assert!(state.camera_pose.approx_eq(&home.camera_pose, 0.001));
        assert_eq!(harness.host.mounts(), vec![mid_sol(), LevelKey::overview()]);
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn click_spam_is_single_flight() {
        let harness = Harness::started(ViewerConfig::default(), FETCH);
        let recorder = StateRecorder::attach(&harness.viewer);

        let events = InputStorm::new(StormConfig::click_spam(), 42).take(60);
        let outcomes = run_storm(&harness, events).await;

        let successes = outcomes.iter().filter(|o| o.is_success()).count();
        let rejected = outcomes
            .iter()
            .filter(|o| matches!(o, TransitionOutcome::Rejected(_)))
            .count();
        assert!(successes >= 1);
        assert!(rejected >= 1);
        assert_eq!(harness.source.max_concurrent_loads(), 1);
        assert_eq!(harness.host.mounts().len(), successes);
        assert_eq!(recorder.admissions(), outcomes.len() - rejected);

        let stats = harness.viewer.coordinator().stats();
        assert_eq!(stats.admitted, stats.succeeded + stats.aborted);
        assert!(!harness.viewer.coordinator().is_in_flight());
        recorder.verify().unwrap();

        harness.viewer.shutdown().await;
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_storms_keep_invariants(seed in any::<u64>(), events in 10usize..40) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let result = runtime.block_on(async move {
                let harness = Harness::started(ViewerConfig::default(), FETCH);
                let recorder = StateRecorder::attach(&harness.viewer);

                let events = InputStorm::new(StormConfig::default(), seed).take(events);
                run_storm(&harness, events).await;

                let verdict = recorder.verify();
                let in_flight = harness.viewer.coordinator().is_in_flight();
                let max_loads = harness.source.max_concurrent_loads();
                harness.viewer.shutdown().await;
                (verdict, in_flight, max_loads)
            });

            let (verdict, in_flight, max_loads) = result;
            prop_assert!(verdict.is_ok(), "{:?}", verdict);
            prop_assert!(!in_flight);
            prop_assert!(max_loads <= 1);
        }
    }
}
