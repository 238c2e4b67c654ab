//! Frame clock for the tick driver

use std::time::Duration;

use parallax_core::FrameTime;
use tokio::time::Instant;

/// Largest elapsed value a single tick may report.
/// Keeps interpolation from leaping after a stall (tab hidden, system sleep).
pub const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Frame clock - monotonic, smooth, driven by the host's refresh
/// INVARIANT: `now()` is monotonically non-decreasing and never jumps by more
/// than `max_delta` per tick
pub struct FrameClock {
    /// Accumulated frame time
    value: FrameTime,
    /// Last tick instant
    last_update: Instant,
    /// Clamp applied to each tick's elapsed time
    max_delta: Duration,
}

impl FrameClock {
    /// Create a new frame clock starting at zero
    pub fn new() -> Self {
        Self::with_max_delta(DEFAULT_MAX_FRAME_DELTA)
    }

    pub fn with_max_delta(max_delta: Duration) -> Self {
        FrameClock {
            value: FrameTime::ZERO,
            last_update: Instant::now(),
            max_delta,
        }
    }

    /// Measure the elapsed time since the previous tick and advance.
    /// Returns the clamped elapsed value handed to tick callbacks.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).min(self.max_delta);

        self.value = self.value.saturating_add(elapsed);
        self.last_update = now;
        elapsed
    }

    /// Forget the time spent suspended; the next tick measures from here
    pub fn resume(&mut self) {
        self.last_update = Instant::now();
    }

    /// Current frame time without advancing
    pub fn now(&self) -> FrameTime {
        self.value
    }

    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
