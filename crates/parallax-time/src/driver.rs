//! Tick driver - fires scheduler ticks at the display rate

use std::time::Duration;

use parallax_core::{frame_interval, TickError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{FrameClock, TickScheduler, DEFAULT_MAX_FRAME_DELTA};

/// Tick driver configuration
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Interval between ticks (one display refresh)
    pub frame_interval: Duration,
    /// Largest elapsed value a single tick may report
    pub max_frame_delta: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        // 60 Hz display
        SchedulerConfig {
            frame_interval: frame_interval(60),
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
        }
    }
}

impl SchedulerConfig {
    /// Configuration for high refresh displays (120 Hz)
    pub fn high_refresh() -> Self {
        SchedulerConfig {
            frame_interval: frame_interval(120),
            max_frame_delta: Duration::from_millis(50),
        }
    }

    /// Configuration for battery-constrained hosts (30 Hz)
    pub fn low_power() -> Self {
        SchedulerConfig {
            frame_interval: frame_interval(30),
            max_frame_delta: Duration::from_millis(150),
        }
    }
}

/// Drives a [`TickScheduler`] continuously.
///
/// Fires one tick per frame interval while at least one callback is
/// registered. With nothing registered it parks on the scheduler's wake-up
/// notification instead of spinning, and resumes on the next `register`.
/// Exits once the scheduler is stopped.
pub struct TickDriver {
    scheduler: TickScheduler,
    clock: FrameClock,
    config: SchedulerConfig,
}

impl TickDriver {
    pub fn new(scheduler: TickScheduler) -> Self {
        Self::with_config(scheduler, SchedulerConfig::default())
    }

    pub fn with_config(scheduler: TickScheduler, config: SchedulerConfig) -> Self {
        TickDriver {
            scheduler,
            clock: FrameClock::with_max_delta(config.max_frame_delta),
            config,
        }
    }

    /// Run until the scheduler stops
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.scheduler.is_stopped() {
                break;
            }

            if self.scheduler.is_empty() {
                tracing::trace!("tick driver suspended");
                self.scheduler.wait_for_work().await;
                self.clock.resume();
                interval.reset();
                continue;
            }

            interval.tick().await;
            let elapsed = self.clock.tick();
            match self.scheduler.run_once(elapsed) {
                Ok(_) => {}
                Err(TickError::Stopped) => break,
                Err(err) => tracing::warn!(%err, "tick skipped"),
            }
        }

        tracing::debug!(ticks = self.scheduler.tick_count(), "tick driver exited");
    }

    /// Spawn the driver on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TickContext, TickControl};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_driver_ticks_at_frame_rate() {
        let scheduler = TickScheduler::new();
        let ticks = Arc::new(Mutex::new(Vec::new()));

        let t = ticks.clone();
        scheduler
            .register(move |ctx: &TickContext| {
                t.lock().push(ctx.elapsed);
                TickControl::Continue
            })
            .unwrap();

        let handle = TickDriver::new(scheduler.clone()).spawn();
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop();
        handle.await.unwrap();

        let ticks = ticks.lock();
        // First tick fires immediately, then every ~16.7ms
        assert!(ticks.len() >= 11 && ticks.len() <= 14, "got {} ticks", ticks.len());
        for dt in ticks.iter().skip(1) {
            assert!(*dt <= Duration::from_millis(18));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_suspends_without_callbacks() {
        let scheduler = TickScheduler::new();
        let handle = TickDriver::new(scheduler.clone()).spawn();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(scheduler.tick_count(), 0);

        // Self-removing callback: resumes the driver for exactly one tick
        scheduler
            .register(|_: &TickContext| TickControl::Remove)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.tick_count(), 1);

        scheduler.stop();
        handle.await.unwrap();
    }
}
