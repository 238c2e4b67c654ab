//! Tick-driven animation tasks
//!
//! An [`AnimationTask`] interpolates a value from `start` to `end` over a
//! duration. Once started on a [`TickScheduler`] it advances only on ticks,
//! hands each interpolated value to its `on_tick` sink, and resolves its
//! completion signal exactly once:
//! - `Completed` when the duration has elapsed
//! - `Finished` when it was told to snap to its end value
//! - `Cancelled` when stopped early (or the control handle is dropped)
//!
//! Its tick callback is removed in every one of those cases.

use std::sync::Arc;
use std::time::Duration;

use parallax_core::TickError;
use parallax_time::{
    completion, Completer, CompletionSignal, TickContext, TickControl, TickHandle, TickScheduler,
};
use parking_lot::Mutex;

use crate::{Easing, Interpolate};

/// How an animation task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationStatus {
    /// Ran for its full duration
    Completed,
    /// Snapped to its end value before the duration elapsed
    Finished,
    /// Stopped without reaching its end value
    Cancelled,
}

impl AnimationStatus {
    /// Whether the animated value reached its end
    pub fn reached_end(self) -> bool {
        !matches!(self, AnimationStatus::Cancelled)
    }
}

/// Signal resolved when an animation task ends; `None` means the task was torn down
pub type AnimationSignal = CompletionSignal<AnimationStatus>;

/// One interpolation from `start` to `end`
#[derive(Clone, Debug)]
pub struct AnimationTask<T> {
    start: T,
    end: T,
    duration: Duration,
    easing: Easing,
    elapsed: Duration,
}

impl<T: Interpolate> AnimationTask<T> {
    pub fn new(start: T, end: T, duration: Duration) -> Self {
        AnimationTask {
            start,
            end,
            duration,
            easing: Easing::default(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Linear progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Interpolated value at the current progress
    pub fn value(&self) -> T {
        if self.is_complete() {
            return self.end.clone();
        }
        self.start
            .interpolate(&self.end, self.easing.apply(self.progress()))
    }

    /// Advance by `dt` and return the new value
    pub fn advance(&mut self, dt: Duration) -> T {
        self.elapsed = self.elapsed.saturating_add(dt);
        self.value()
    }

    /// Jump to the end value
    pub fn snap(&mut self) -> T {
        self.elapsed = self.duration;
        self.end.clone()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn end(&self) -> &T {
        &self.end
    }
}

struct RunState<T> {
    task: AnimationTask<T>,
    completer: Completer<AnimationStatus>,
    snap_requested: bool,
}

impl<T: Interpolate + Send + 'static> AnimationTask<T> {
    /// Start the task on `scheduler`. `on_tick` receives the interpolated
    /// value on every tick, the end value included.
    pub fn start<F>(
        self,
        scheduler: &TickScheduler,
        mut on_tick: F,
    ) -> Result<(AnimationControl, AnimationSignal), TickError>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (completer, signal) = completion();
        let state = Arc::new(Mutex::new(RunState {
            task: self,
            completer,
            snap_requested: false,
        }));

        let tick_state = state.clone();
        let handle = scheduler.register(move |ctx: &TickContext| {
            let (value, finished) = {
                let mut state = tick_state.lock();
                if !state.completer.is_pending() {
                    return TickControl::Remove;
                }
                let value = if state.snap_requested {
                    state.task.snap()
                } else {
                    state.task.advance(ctx.elapsed)
                };
                let finished = state.task.is_complete().then_some(if state.snap_requested {
                    AnimationStatus::Finished
                } else {
                    AnimationStatus::Completed
                });
                (value, finished)
            };

            // The sink may call back into the control handle
            on_tick(value);

            match finished {
                Some(status) => {
                    tick_state.lock().completer.complete(status);
                    TickControl::Remove
                }
                None => TickControl::Continue,
            }
        })?;

        let control = AnimationControl {
            handle,
            scheduler: scheduler.clone(),
            state: Box::new(TaskState(state)),
        };
        Ok((control, signal))
    }
}

/// Type-erased access to a running task's state
trait ControlState: Send + Sync {
    fn cancel(&self) -> bool;
    fn request_snap(&self) -> bool;
    fn is_running(&self) -> bool;
}

struct TaskState<T>(Arc<Mutex<RunState<T>>>);

impl<T: Send + 'static> ControlState for TaskState<T> {
    fn cancel(&self) -> bool {
        self.0.lock().completer.complete(AnimationStatus::Cancelled)
    }

    fn request_snap(&self) -> bool {
        let mut state = self.0.lock();
        if !state.completer.is_pending() {
            return false;
        }
        state.snap_requested = true;
        true
    }

    fn is_running(&self) -> bool {
        self.0.lock().completer.is_pending()
    }
}

/// Handle to a running animation task.
///
/// Dropping the handle cancels the task, so a torn-down owner never leaves
/// a tick callback behind.
pub struct AnimationControl {
    handle: TickHandle,
    scheduler: TickScheduler,
    state: Box<dyn ControlState>,
}

impl AnimationControl {
    /// Stop the task where it is. Its signal resolves `Cancelled`.
    /// Returns false if it had already ended.
    pub fn cancel(&self) -> bool {
        self.scheduler.unregister(self.handle);
        let cancelled = self.state.cancel();
        if cancelled {
            tracing::trace!(handle = ?self.handle, "animation cancelled");
        }
        cancelled
    }

    /// Ask the task to jump to its end value on the next tick.
    /// Its signal then resolves `Finished`.
    pub fn finish(&self) -> bool {
        self.state.request_snap()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

impl Drop for AnimationControl {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for AnimationControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationControl")
            .field("handle", &self.handle)
            .field("running", &self.is_running())
            .finish()
    }
}
