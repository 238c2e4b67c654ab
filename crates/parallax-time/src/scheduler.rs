//! Render tick scheduler
//!
//! Every piece of time-dependent state (camera interpolation, text reveal)
//! advances from here and nowhere else. A tick invokes each registered
//! callback once, in registration order, with one shared [`TickContext`].
//!
//! Registration changes made while a tick is running are deferred:
//! - a callback registered mid-tick first runs on the next tick
//! - a callback unregistered mid-tick still finishes the current tick and is
//!   dropped when it ends
//!
//! Ticks never overlap. A callback that tries to run a tick from inside a
//! tick gets [`TickError::Reentrant`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parallax_core::{FrameTime, TickError};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Handle returned by [`TickScheduler::register`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(u64);

impl fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick(#{})", self.0)
    }
}

/// What every callback sees during one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickContext {
    /// Tick sequence number, starting at 1
    pub tick: u64,
    /// Elapsed time since the previous tick
    pub elapsed: Duration,
    /// Frame time after applying `elapsed`
    pub now: FrameTime,
}

/// Returned by a callback to stay registered or to drop itself
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Remove,
}

pub type TickCallback = Box<dyn FnMut(&TickContext) -> TickControl + Send + 'static>;

struct Entry {
    handle: TickHandle,
    callback: TickCallback,
}

#[derive(Default)]
struct SchedulerInner {
    /// Callbacks in registration order
    entries: Vec<Entry>,
    /// Registered during the running tick
    added: Vec<Entry>,
    /// Handles taken out to run the current tick
    in_tick: Vec<TickHandle>,
    /// Unregistered during the running tick
    removed: HashSet<TickHandle>,
    /// Tick currently running, if any
    running: Option<u64>,
    next_handle: u64,
    tick: u64,
    now: FrameTime,
    stopped: bool,
}

impl SchedulerInner {
    fn live_count(&self) -> usize {
        let running = self
            .in_tick
            .iter()
            .filter(|h| !self.removed.contains(h))
            .count();
        self.entries.len() + running + self.added.len()
    }

    fn is_registered(&self, handle: TickHandle) -> bool {
        (self.in_tick.contains(&handle) && !self.removed.contains(&handle))
            || self.entries.iter().any(|e| e.handle == handle)
            || self.added.iter().any(|e| e.handle == handle)
    }
}

/// The cooperative tick scheduler. Cloning yields another handle to the
/// same scheduler.
#[derive(Clone)]
pub struct TickScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
    wake: Arc<Notify>,
}

impl TickScheduler {
    pub fn new() -> Self {
        TickScheduler {
            inner: Arc::new(Mutex::new(SchedulerInner::default())),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Register a per-tick callback.
    /// Wakes a suspended driver.
    pub fn register<F>(&self, callback: F) -> Result<TickHandle, TickError>
    where
        F: FnMut(&TickContext) -> TickControl + Send + 'static,
    {
        let handle = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return Err(TickError::Stopped);
            }
            inner.next_handle += 1;
            let handle = TickHandle(inner.next_handle);
            let entry = Entry {
                handle,
                callback: Box::new(callback),
            };
            if inner.running.is_some() {
                inner.added.push(entry);
            } else {
                inner.entries.push(entry);
            }
            handle
        };

        tracing::trace!(?handle, "tick callback registered");
        self.wake.notify_one();
        Ok(handle)
    }

    /// Unregister a callback. Idempotent, and a no-op after `stop()`.
    pub fn unregister(&self, handle: TickHandle) {
        let mut inner = self.inner.lock();

        // Registered and dropped within the same tick: never runs
        inner.added.retain(|e| e.handle != handle);

        if inner.running.is_some() {
            if inner.in_tick.contains(&handle) {
                inner.removed.insert(handle);
            }
        } else {
            inner.entries.retain(|e| e.handle != handle);
        }
    }

    /// Run one tick with the given elapsed time
    pub fn run_once(&self, elapsed: Duration) -> Result<TickContext, TickError> {
        let (ctx, mut entries) = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return Err(TickError::Stopped);
            }
            if let Some(tick) = inner.running {
                return Err(TickError::Reentrant(tick));
            }
            inner.tick += 1;
            inner.now = inner.now.saturating_add(elapsed);
            inner.running = Some(inner.tick);

            let ctx = TickContext {
                tick: inner.tick,
                elapsed,
                now: inner.now,
            };
            let entries = std::mem::take(&mut inner.entries);
            inner.in_tick = entries.iter().map(|e| e.handle).collect();
            (ctx, entries)
        };

        // Callbacks run without the lock held so they can register,
        // unregister or write shared state freely.
        let mut finished = Vec::new();
        for entry in entries.iter_mut() {
            if (entry.callback)(&ctx) == TickControl::Remove {
                finished.push(entry.handle);
            }
        }

        let mut inner = self.inner.lock();
        let removed = std::mem::take(&mut inner.removed);
        entries.retain(|e| !removed.contains(&e.handle) && !finished.contains(&e.handle));
        let added = std::mem::take(&mut inner.added);
        entries.extend(added);
        inner.running = None;
        inner.in_tick.clear();

        if inner.stopped {
            entries.clear();
        }
        inner.entries = entries;

        Ok(ctx)
    }

    /// Stop the scheduler: drop every callback and refuse new ones
    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock();
            inner.stopped = true;
            inner.added.clear();
            if inner.running.is_none() {
                inner.entries.clear();
            } else {
                let running = inner.in_tick.clone();
                inner.removed.extend(running);
            }
        }
        tracing::debug!("tick scheduler stopped");
        self.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Number of callbacks that will run on the next tick
    pub fn len(&self) -> usize {
        self.inner.lock().live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_registered(&self, handle: TickHandle) -> bool {
        self.inner.lock().is_registered(handle)
    }

    /// Number of ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.inner.lock().tick
    }

    /// Frame time after the last tick
    pub fn now(&self) -> FrameTime {
        self.inner.lock().now
    }

    /// Suspend until there is something to tick, or the scheduler stops
    pub async fn wait_for_work(&self) {
        loop {
            let notified = self.wake.notified();
            {
                let inner = self.inner.lock();
                if inner.stopped || inner.live_count() > 0 {
                    return;
                }
            }
            notified.await;
        }
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TickScheduler")
            .field("callbacks", &inner.live_count())
            .field("tick", &inner.tick)
            .field("stopped", &inner.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> TickCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let make = move |name: &'static str| -> TickCallback {
            let log = log2.clone();
            Box::new(move |_: &TickContext| {
                log.lock().push(name);
                TickControl::Continue
            })
        };
        (log, make)
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let scheduler = TickScheduler::new();
        let (log, make) = recorder();

        scheduler.register(make("camera")).unwrap();
        scheduler.register(make("reveal")).unwrap();
        scheduler.register(make("hud")).unwrap();

        scheduler.run_once(FRAME).unwrap();
        scheduler.run_once(FRAME).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["camera", "reveal", "hud", "camera", "reveal", "hud"]
        );
    }

    #[test]
    fn test_all_callbacks_share_tick_context() {
        let scheduler = TickScheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let seen = seen.clone();
            scheduler
                .register(move |ctx: &TickContext| {
                    seen.lock().push(*ctx);
                    TickControl::Continue
                })
                .unwrap();
        }

        let ctx = scheduler.run_once(Duration::from_millis(7)).unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|c| *c == ctx));
        assert_eq!(ctx.tick, 1);
        assert_eq!(ctx.now.as_millis(), 7);
    }

    #[test]
    fn test_register_mid_tick_applies_next_tick() {
        let scheduler = TickScheduler::new();
        let count = Arc::new(Mutex::new(0u32));

        let sched = scheduler.clone();
        let count2 = count.clone();
        let mut spawned = false;
        scheduler
            .register(move |_: &TickContext| {
                if !spawned {
                    spawned = true;
                    let count = count2.clone();
                    sched
                        .register(move |_: &TickContext| {
                            *count.lock() += 1;
                            TickControl::Continue
                        })
                        .unwrap();
                }
                TickControl::Continue
            })
            .unwrap();

        scheduler.run_once(FRAME).unwrap();
        assert_eq!(*count.lock(), 0);
        assert_eq!(scheduler.len(), 2);

        scheduler.run_once(FRAME).unwrap();
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_unregister_mid_tick_is_deferred() {
        let scheduler = TickScheduler::new();
        let (log, make) = recorder();

        let victim_slot: Arc<Mutex<Option<TickHandle>>> = Arc::new(Mutex::new(None));
        let sched = scheduler.clone();
        let slot = victim_slot.clone();
        scheduler
            .register(move |_: &TickContext| {
                if let Some(h) = *slot.lock() {
                    sched.unregister(h);
                }
                TickControl::Continue
            })
            .unwrap();
        let victim = scheduler.register(make("victim")).unwrap();
        *victim_slot.lock() = Some(victim);

        // Still runs during the tick in which it was unregistered
        scheduler.run_once(FRAME).unwrap();
        assert_eq!(*log.lock(), vec!["victim"]);
        assert!(!scheduler.is_registered(victim));

        scheduler.run_once(FRAME).unwrap();
        assert_eq!(*log.lock(), vec!["victim"]);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let scheduler = TickScheduler::new();
        let (_, make) = recorder();
        let h = scheduler.register(make("a")).unwrap();

        scheduler.unregister(h);
        scheduler.unregister(h);
        assert!(scheduler.is_empty());

        scheduler.stop();
        scheduler.unregister(h);
    }

    #[test]
    fn test_callback_can_remove_itself() {
        let scheduler = TickScheduler::new();
        let mut remaining = 3;
        scheduler
            .register(move |_: &TickContext| {
                remaining -= 1;
                if remaining == 0 {
                    TickControl::Remove
                } else {
                    TickControl::Continue
                }
            })
            .unwrap();

        for _ in 0..3 {
            assert_eq!(scheduler.len(), 1);
            scheduler.run_once(FRAME).unwrap();
        }
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_reentrant_tick_is_refused() {
        let scheduler = TickScheduler::new();
        let result = Arc::new(Mutex::new(None));

        let sched = scheduler.clone();
        let result2 = result.clone();
        scheduler
            .register(move |_: &TickContext| {
                *result2.lock() = Some(sched.run_once(FRAME));
                TickControl::Continue
            })
            .unwrap();

        scheduler.run_once(FRAME).unwrap();
        assert_eq!(*result.lock(), Some(Err(TickError::Reentrant(1))));
        assert_eq!(scheduler.tick_count(), 1);
    }

    #[test]
    fn test_stopped_scheduler_refuses_work() {
        let scheduler = TickScheduler::new();
        let (_, make) = recorder();
        scheduler.register(make("a")).unwrap();

        scheduler.stop();

        assert!(scheduler.is_empty());
        assert_eq!(scheduler.register(make("b")).err(), Some(TickError::Stopped));
        assert_eq!(scheduler.run_once(FRAME), Err(TickError::Stopped));
    }

    #[tokio::test]
    async fn test_wait_for_work_resumes_on_register() {
        let scheduler = TickScheduler::new();
        let sched = scheduler.clone();

        let waiter = tokio::spawn(async move { sched.wait_for_work().await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        scheduler
            .register(|_: &TickContext| TickControl::Continue)
            .unwrap();
        waiter.await.unwrap();
    }

    proptest! {
        #[test]
        fn prop_each_callback_runs_once_per_tick(callbacks in 1usize..8, ticks in 1u64..20) {
            let scheduler = TickScheduler::new();
            let counts: Vec<_> = (0..callbacks).map(|_| Arc::new(Mutex::new(0u64))).collect();
            for c in &counts {
                let c = c.clone();
                scheduler.register(move |_: &TickContext| {
                    *c.lock() += 1;
                    TickControl::Continue
                }).unwrap();
            }
            for _ in 0..ticks {
                scheduler.run_once(FRAME).unwrap();
            }
            for c in &counts {
                prop_assert_eq!(*c.lock(), ticks);
            }
        }
    }
}
