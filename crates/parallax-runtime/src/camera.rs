//! Camera rig - moves the scene camera on the render tick
//!
//! At most one camera move runs at a time. Starting a new move cancels the
//! previous one; every interpolated pose is written to the scene store.
//! A move's writes stop once `cancel` returns, even if its tick callback
//! was already running on another thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parallax_core::TickError;
use parallax_state::{ScenePatch, SceneStore};
use parallax_time::TickScheduler;
use parallax_visual::{AnimationControl, AnimationSignal, AnimationTask, CameraPose, Easing};
use parking_lot::Mutex;

struct ActiveMove {
    control: AnimationControl,
    live: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct CameraRig {
    scheduler: TickScheduler,
    store: SceneStore,
    active: Arc<Mutex<Option<ActiveMove>>>,
}

impl CameraRig {
    pub fn new(scheduler: TickScheduler, store: SceneStore) -> Self {
        CameraRig {
            scheduler,
            store,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Fly from the current pose to `target`
    pub fn move_to(
        &self,
        target: CameraPose,
        duration: Duration,
        easing: Easing,
    ) -> Result<AnimationSignal, TickError> {
        self.cancel();

        let start = self.store.get().camera_pose;
        let live = Arc::new(AtomicBool::new(true));
        let (control, signal) = AnimationTask::new(start, target, duration)
            .easing(easing)
            .start(&self.scheduler, pose_writer(self.store.clone(), live.clone()))?;

        let displaced = self.active.lock().replace(ActiveMove { control, live });
        drop(displaced);
        tracing::debug!(?duration, "camera move started");
        Ok(signal)
    }

    /// Stop the current move where it is. Its signal resolves `Cancelled`.
    pub fn cancel(&self) -> bool {
        let active = self.active.lock().take();
        match active {
            Some(active) => {
                active.live.store(false, Ordering::SeqCst);
                active.control.cancel()
            }
            None => false,
        }
    }

    /// Snap the current move to its target on the next tick
    pub fn finish(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map_or(false, |active| active.control.finish())
    }

    pub fn is_moving(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map_or(false, |active| active.control.is_running())
    }
}

/// Sink for one move's poses. The flag is read under the store lock, so
/// no pose of a cancelled move lands after a write that follows `cancel`.
fn pose_writer(
    store: SceneStore,
    live: Arc<AtomicBool>,
) -> impl FnMut(CameraPose) + Send + 'static {
    move |pose| {
        let written = store.update(|_| {
            live.load(Ordering::SeqCst)
                .then(|| ScenePatch::new().camera_pose(pose))
        });
        match written {
            Ok(Some(_)) => {}
            Ok(None) => tracing::trace!("pose of a cancelled camera move dropped"),
            Err(err) => tracing::warn!(%err, "camera pose not applied"),
        }
    }
}

impl std::fmt::Debug for CameraRig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRig")
            .field("moving", &self.is_moving())
            .finish()
    }
}
