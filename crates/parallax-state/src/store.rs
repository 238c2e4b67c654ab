//! Scene store - owns the scene state and guards its invariants
//!
//! Every mutation goes through [`SceneStore::set`], which validates the whole
//! patch before applying any of it:
//! - the phase may only move along the transition sequence, be forced to
//!   Idle, or enter Resetting from an active phase
//! - the view level may only change in a batch that ends in Swapping
//! - the reveal fraction is clamped to [0, 1] and never moves backwards
//!   while a reveal is active on the same text
//!
//! Listeners run once per applied batch, after the lock is released, so a
//! listener may read or write the store itself.

use std::sync::{Arc, Weak};

use parallax_core::{StoreError, TransitionPhase};
use parking_lot::Mutex;

use crate::{FeedSet, ScenePatch, SceneState, StateFeed};

type Listener = Arc<dyn Fn(&SceneState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

struct StoreInner {
    state: SceneState,
    feeds: FeedSet,
}

/// Shared handle to the scene state
#[derive(Clone)]
pub struct SceneStore {
    inner: Arc<Mutex<StoreInner>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    pub fn new() -> Self {
        Self::with_state(SceneState::default())
    }

    /// Store seeded with `state` (used to restore a saved view)
    pub fn with_state(state: SceneState) -> Self {
        SceneStore {
            inner: Arc::new(Mutex::new(StoreInner {
                state,
                feeds: FeedSet::new(),
            })),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Snapshot of the current state
    pub fn get(&self) -> SceneState {
        self.inner.lock().state.clone()
    }

    pub fn phase(&self) -> TransitionPhase {
        self.inner.lock().state.transition_phase
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock().state.revision
    }

    /// Apply `patch` as one batch and return the resulting state.
    ///
    /// A rejected patch leaves the state untouched and notifies nobody.
    pub fn set(&self, patch: ScenePatch) -> Result<SceneState, StoreError> {
        let snapshot = {
            let mut inner = self.inner.lock();
            if patch.is_empty() {
                return Ok(inner.state.clone());
            }
            commit(&mut inner, patch)?
        };
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Build a patch from the current state and apply it, both under the
    /// store lock. `Ok(None)` when `build` declines to write.
    ///
    /// Tick-driven writers use this to drop a write whose owner was
    /// cancelled between the tick starting and the write landing.
    pub fn update<F>(&self, build: F) -> Result<Option<SceneState>, StoreError>
    where
        F: FnOnce(&SceneState) -> Option<ScenePatch>,
    {
        let snapshot = {
            let mut inner = self.inner.lock();
            match build(&inner.state) {
                Some(patch) if !patch.is_empty() => commit(&mut inner, patch)?,
                _ => return Ok(None),
            }
        };
        self.notify(&snapshot);
        Ok(Some(snapshot))
    }

    fn notify(&self, snapshot: &SceneState) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    /// Register a listener called with the new state after every batch.
    /// The listener stays registered until the returned subscription is
    /// dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SceneState) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    /// Open a bounded feed of state snapshots
    pub fn feed(&self, capacity: usize) -> StateFeed {
        self.inner.lock().feeds.open(capacity)
    }

    pub fn feed_count(&self) -> usize {
        self.inner.lock().feeds.len()
    }
}

impl std::fmt::Debug for SceneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneStore")
            .field("state", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Keeps a listener registered; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn commit(inner: &mut StoreInner, patch: ScenePatch) -> Result<SceneState, StoreError> {
    if let Err(err) = validate(&inner.state, &patch) {
        tracing::warn!(%err, phase = %inner.state.transition_phase, "scene patch rejected");
        return Err(err);
    }

    let from = inner.state.transition_phase;
    apply(&mut inner.state, patch);
    if inner.state.transition_phase != from {
        tracing::debug!(
            from = %from,
            to = %inner.state.transition_phase,
            revision = inner.state.revision,
            "transition phase"
        );
    }

    let snapshot = inner.state.clone();
    // Feeds never block, so they are fed in batch order under the lock
    inner.feeds.publish(&snapshot);
    Ok(snapshot)
}

fn sanitize_fraction(fraction: f32) -> f32 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

fn validate(state: &SceneState, patch: &ScenePatch) -> Result<(), StoreError> {
    let from = state.transition_phase;
    let phase = match patch.phase {
        Some(to) if !from.can_move_to(to) => {
            return Err(StoreError::IllegalPhase { from, to });
        }
        Some(to) => to,
        None => from,
    };

    if let Some(level) = patch.view_level {
        if level != state.view_level && phase != TransitionPhase::Swapping {
            return Err(StoreError::LevelOutsideSwap {
                from: state.view_level,
                to: level,
                phase,
            });
        }
    }

    if let (None, Some(requested)) = (&patch.reveal_text, patch.reveal_fraction) {
        let requested = sanitize_fraction(requested);
        let current = state.reveal.revealed_fraction;
        if state.reveal.active && requested < current {
            return Err(StoreError::RevealRegressed { current, requested });
        }
    }

    Ok(())
}

fn apply(state: &mut SceneState, patch: ScenePatch) {
    if let Some(level) = patch.view_level {
        state.view_level = level;
    }
    if let Some(key) = patch.level_key {
        state.level_key = key;
    }
    if let Some(selection) = patch.selection {
        state.selection = selection;
    }
    if let Some(pose) = patch.camera_pose {
        state.camera_pose = pose;
    }
    if let Some(text) = patch.reveal_text {
        state.reveal.source_text = text;
        state.reveal.revealed_fraction = 0.0;
    }
    if let Some(fraction) = patch.reveal_fraction {
        state.reveal.revealed_fraction = sanitize_fraction(fraction);
    }
    if let Some(active) = patch.reveal_active {
        state.reveal.active = active;
    }
    if let Some(phase) = patch.phase {
        state.transition_phase = phase;
    }
    if let Some(guard) = patch.guard {
        state.guard = guard;
    }
    state.revision += 1;
}
