//! Reveal controller
//!
//! One reveal runs at a time. Each reveal owns a tick callback that adds
//! `elapsed * rate / len` to the revealed fraction and removes itself once
//! the fraction reaches 1. The reveal's handle resolves exactly once:
//!
//! - `Completed`: the whole text is visible
//! - `Interrupted`: a newer `start` replaced it
//! - `Cancelled`: `cancel` stopped it

use std::sync::Arc;
use std::time::Duration;

use parallax_core::TickError;
use parallax_state::{ScenePatch, SceneStore};
use parallax_time::{
    completion, Completer, CompletionSignal, TickContext, TickControl, TickHandle, TickScheduler,
};
use parking_lot::Mutex;

use crate::RevealConfig;

/// How a reveal ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealStatus {
    Completed,
    Interrupted,
    Cancelled,
}

/// Resolves when the reveal ends; `None` if the controller was torn down
pub type RevealHandle = CompletionSignal<RevealStatus>;

/// Progress of one reveal
struct RevealRun {
    completer: Completer<RevealStatus>,
    /// The text this run published; progress is only written while the
    /// store still shows it
    text: Arc<str>,
    total_chars: usize,
    rate: f32,
    elapsed: Duration,
    finish_requested: bool,
}

impl RevealRun {
    /// Add `dt` of tick time and return the new fraction
    fn advance(&mut self, dt: Duration) -> f32 {
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.finish_requested || self.total_chars == 0 {
            return 1.0;
        }
        let shown = self.elapsed.as_secs_f64() * self.rate as f64;
        (shown / self.total_chars as f64).min(1.0) as f32
    }
}

struct ActiveReveal {
    id: u64,
    handle: TickHandle,
    run: Arc<Mutex<RevealRun>>,
}

impl ActiveReveal {
    fn end(self, scheduler: &TickScheduler, status: RevealStatus) -> bool {
        scheduler.unregister(self.handle);
        self.run.lock().completer.complete(status)
    }
}

#[derive(Default)]
struct ControllerInner {
    next_id: u64,
    active: Option<ActiveReveal>,
}

/// Drives the reveal state in the scene store
#[derive(Clone)]
pub struct RevealController {
    scheduler: TickScheduler,
    store: SceneStore,
    config: RevealConfig,
    inner: Arc<Mutex<ControllerInner>>,
}

impl RevealController {
    pub fn new(scheduler: TickScheduler, store: SceneStore) -> Self {
        Self::with_config(scheduler, store, RevealConfig::default())
    }

    pub fn with_config(scheduler: TickScheduler, store: SceneStore, config: RevealConfig) -> Self {
        RevealController {
            scheduler,
            store,
            config,
            inner: Arc::new(Mutex::new(ControllerInner::default())),
        }
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Start revealing `text` at `rate` characters per second (configured
    /// speed when `None`). A reveal still running is interrupted.
    pub fn start(&self, text: &str, rate: Option<f32>) -> Result<RevealHandle, TickError> {
        let rate = self.config.effective_rate(rate);
        let previous = self.inner.lock().active.take();
        if let Some(previous) = previous {
            if previous.end(&self.scheduler, RevealStatus::Interrupted) {
                tracing::debug!("reveal interrupted by a newer one");
            }
        }

        let text: Arc<str> = Arc::from(text);
        if let Err(err) = self.store.set(
            ScenePatch::new()
                .reveal_text(text.clone())
                .reveal_active(true),
        ) {
            tracing::warn!(%err, "reveal text not applied");
        }

        let (completer, signal) = completion();
        let total_chars = text.chars().count();
        let run = Arc::new(Mutex::new(RevealRun {
            completer,
            text,
            total_chars,
            rate,
            elapsed: Duration::ZERO,
            finish_requested: false,
        }));

        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            inner.next_id
        };

        let handle = match self.scheduler.register(self.tick_callback(id, run.clone())) {
            Ok(handle) => handle,
            Err(err) => {
                // Without a tick nothing would ever advance the text
                let _ = self.store.set(ScenePatch::new().reveal_active(false));
                return Err(err);
            }
        };

        let displaced = self
            .inner
            .lock()
            .active
            .replace(ActiveReveal { id, handle, run });
        if let Some(displaced) = displaced {
            displaced.end(&self.scheduler, RevealStatus::Interrupted);
        }

        tracing::debug!(chars = total_chars, rate, "reveal started");
        Ok(signal)
    }

    /// Stop the running reveal where it is. Returns false if none was running.
    pub fn cancel(&self) -> bool {
        let Some(active) = self.inner.lock().active.take() else {
            return false;
        };
        active.end(&self.scheduler, RevealStatus::Cancelled);
        if let Err(err) = self.store.set(ScenePatch::new().reveal_active(false)) {
            tracing::warn!(%err, "reveal cancel not applied");
        }
        tracing::debug!("reveal cancelled");
        true
    }

    /// Make the running reveal show its whole text on the next tick.
    /// Returns false if none was running.
    pub fn finish(&self) -> bool {
        let inner = self.inner.lock();
        match &inner.active {
            Some(active) => {
                active.run.lock().finish_requested = true;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    fn tick_callback(
        &self,
        id: u64,
        run: Arc<Mutex<RevealRun>>,
    ) -> impl FnMut(&TickContext) -> TickControl + Send + 'static {
        let store = self.store.clone();
        let inner = self.inner.clone();

        move |ctx: &TickContext| {
            let (fraction, text) = {
                let mut run = run.lock();
                if !run.completer.is_pending() {
                    return TickControl::Remove;
                }
                (run.advance(ctx.elapsed), run.text.clone())
            };

            let done = fraction >= 1.0;
            let mut patch = ScenePatch::new().reveal_fraction(fraction);
            if done {
                patch = patch.reveal_active(false);
            }
            // Cancelled or replaced since the check above: the store no
            // longer shows this run, so the write is dropped
            let written = store.update(|state| {
                let owned =
                    state.reveal.active && Arc::ptr_eq(&state.reveal.source_text, &text);
                owned.then_some(patch)
            });
            let status = match written {
                Ok(Some(_)) if !done => return TickControl::Continue,
                Ok(Some(_)) => RevealStatus::Completed,
                Ok(None) => {
                    tracing::debug!("reveal no longer shown, stopping");
                    RevealStatus::Interrupted
                }
                Err(err) => {
                    tracing::warn!(%err, "reveal progress not applied");
                    if !done {
                        return TickControl::Continue;
                    }
                    RevealStatus::Completed
                }
            };

            {
                let mut inner = inner.lock();
                if inner.active.as_ref().map(|a| a.id) == Some(id) {
                    inner.active = None;
                }
            }
            run.lock().completer.complete(status);
            TickControl::Remove
        }
    }
}

impl std::fmt::Debug for RevealController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealController")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn setup() -> (TickScheduler, SceneStore, RevealController) {
        let scheduler = TickScheduler::new();
        let store = SceneStore::new();
        let reveal = RevealController::new(scheduler.clone(), store.clone());
        (scheduler, store, reveal)
    }

    fn ticks(scheduler: &TickScheduler, n: usize, dt: Duration) {
        for _ in 0..n {
            scheduler.run_once(dt).unwrap();
        }
    }

    #[tokio::test]
    async fn test_ninety_chars_at_default_rate() {
        let (scheduler, store, reveal) = setup();
        let text = "x".repeat(90);
        let mut handle = reveal.start(&text, None).unwrap();

        let state = store.get();
        assert!(state.reveal.active);
        assert_eq!(state.reveal.revealed_fraction, 0.0);

        // 90 / 66 s = 1363.6 ms; 81 frames are 1350 ms, 82 are 1366.7 ms
        ticks(&scheduler, 81, FRAME);
        assert!(store.get().reveal.active);
        assert_eq!(handle.try_take(), None);

        ticks(&scheduler, 1, FRAME);
        let state = store.get();
        assert!(!state.reveal.active);
        assert_eq!(state.reveal.revealed_fraction, 1.0);
        assert_eq!(state.reveal.visible_text(), text);
        assert_eq!(handle.await, Some(RevealStatus::Completed));
        assert!(scheduler.is_empty());
        assert!(!reveal.is_active());
    }

    #[tokio::test]
    async fn test_empty_text_completes_next_tick() {
        let (scheduler, store, reveal) = setup();
        let handle = reveal.start("", None).unwrap();

        ticks(&scheduler, 1, FRAME);
        assert_eq!(store.get().reveal.revealed_fraction, 1.0);
        assert_eq!(handle.await, Some(RevealStatus::Completed));
    }

    #[tokio::test]
    async fn test_new_start_interrupts_previous() {
        let (scheduler, store, reveal) = setup();
        let first = reveal.start("first description", None).unwrap();
        ticks(&scheduler, 3, FRAME);

        let second = reveal.start("second", None).unwrap();
        assert_eq!(first.await, Some(RevealStatus::Interrupted));

        let state = store.get();
        assert_eq!(&*state.reveal.source_text, "second");
        assert_eq!(state.reveal.revealed_fraction, 0.0);
        assert_eq!(scheduler.len(), 1);

        ticks(&scheduler, 10, FRAME);
        assert_eq!(second.await, Some(RevealStatus::Completed));
    }

    #[tokio::test]
    async fn test_cancel_stops_without_completing() {
        let (scheduler, store, reveal) = setup();
        let handle = reveal.start("a fairly long description", None).unwrap();
        ticks(&scheduler, 2, FRAME);

        assert!(reveal.cancel());
        assert!(!reveal.cancel());
        assert!(scheduler.is_empty());

        let state = store.get();
        assert!(!state.reveal.active);
        assert!(state.reveal.revealed_fraction < 1.0);
        assert_eq!(handle.await, Some(RevealStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_no_progress_written_after_rollback() {
        let (scheduler, store, reveal) = setup();
        let handle = reveal.start("a fairly long description", None).unwrap();
        ticks(&scheduler, 2, FRAME);

        // Another writer restores an earlier reveal before the callback
        // learns its run was stopped
        store
            .set(
                ScenePatch::new()
                    .reveal_text("earlier")
                    .reveal_fraction(1.0)
                    .reveal_active(false),
            )
            .unwrap();
        let revision = store.revision();

        ticks(&scheduler, 1, FRAME);
        let state = store.get();
        assert_eq!(state.revision, revision);
        assert_eq!(&*state.reveal.source_text, "earlier");
        assert_eq!(state.reveal.revealed_fraction, 1.0);
        assert!(scheduler.is_empty());
        assert!(!reveal.is_active());
        assert_eq!(handle.await, Some(RevealStatus::Interrupted));
    }

    #[tokio::test]
    async fn test_same_text_restart_owns_progress() {
        let (scheduler, store, reveal) = setup();
        let text = "z".repeat(200);
        let first = reveal.start(&text, None).unwrap();
        ticks(&scheduler, 5, FRAME);

        let second = reveal.start(&text, None).unwrap();
        assert_eq!(first.await, Some(RevealStatus::Interrupted));
        ticks(&scheduler, 1, FRAME);

        let fraction = store.get().reveal.revealed_fraction;
        assert!(fraction > 0.0 && fraction < 0.01, "fraction {fraction}");
        reveal.cancel();
        assert_eq!(second.await, Some(RevealStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_finish_snaps_on_next_tick() {
        let (scheduler, store, reveal) = setup();
        let handle = reveal.start(&"y".repeat(500), None).unwrap();
        ticks(&scheduler, 1, FRAME);

        assert!(reveal.finish());
        ticks(&scheduler, 1, FRAME);
        assert_eq!(store.get().reveal.revealed_fraction, 1.0);
        assert_eq!(handle.await, Some(RevealStatus::Completed));
        assert!(!reveal.finish());
    }

    #[tokio::test]
    async fn test_custom_rate() {
        let (scheduler, _store, reveal) = setup();
        let handle = reveal.start("0123456789", Some(1000.0)).unwrap();
        ticks(&scheduler, 1, Duration::from_millis(10));
        assert_eq!(handle.await, Some(RevealStatus::Completed));
    }

    #[test]
    fn test_start_on_stopped_scheduler() {
        let (scheduler, store, reveal) = setup();
        scheduler.stop();
        assert_eq!(reveal.start("text", None).unwrap_err(), TickError::Stopped);
        assert!(!store.get().reveal.active);
        assert!(!reveal.is_active());
    }

    proptest! {
        #[test]
        fn prop_fraction_monotonic(
            len in 0usize..200,
            frames in prop::collection::vec(0u64..120_000, 1..120),
        ) {
            let (scheduler, store, reveal) = setup();
            let _handle = reveal.start(&"z".repeat(len), None).unwrap();

            let mut last = 0.0f32;
            for micros in frames {
                scheduler.run_once(Duration::from_micros(micros)).unwrap();
                let fraction = store.get().reveal.revealed_fraction;
                prop_assert!(fraction >= last);
                prop_assert!(fraction <= 1.0);
                last = fraction;
            }
        }
    }
}
