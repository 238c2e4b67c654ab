//! Input storms - seeded bursts of user input
//!
//! Simulates an impatient user:
//! - Rapid repeated clicks on the star map
//! - Escape presses (external abort)
//! - The renderer tearing the scene down mid-flight

use std::time::Duration;

use parallax_core::ViewLevel;
use parallax_runtime::TransitionRequest;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fixtures::{earth, sol, vega};

/// Input storm configuration
#[derive(Clone, Debug)]
pub struct StormConfig {
    /// Shortest gap between two inputs
    pub min_gap: Duration,
    /// Longest gap between two inputs
    pub max_gap: Duration,
    /// Probability that an input is an abort
    pub abort_prob: f64,
    /// Probability that an input is a scene disposal
    pub dispose_prob: f64,
    /// Probability that a request carries its selection
    pub carry_prob: f64,
}

impl Default for StormConfig {
    fn default() -> Self {
        StormConfig {
            min_gap: Duration::from_millis(5),
            max_gap: Duration::from_millis(900),
            abort_prob: 0.05,
            dispose_prob: 0.03,
            carry_prob: 0.2,
        }
    }
}

impl StormConfig {
    /// Clicks only, faster than the debounce window
    pub fn click_spam() -> Self {
        StormConfig {
            min_gap: Duration::from_millis(1),
            max_gap: Duration::from_millis(120),
            abort_prob: 0.0,
            dispose_prob: 0.0,
            carry_prob: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StormAction {
    Request(TransitionRequest),
    Abort,
    DisposeScene,
}

/// One input and the pause before it
#[derive(Clone, Debug, PartialEq)]
pub struct StormEvent {
    pub after: Duration,
    pub action: StormAction,
}

/// Deterministic generator of storm events
pub struct InputStorm {
    config: StormConfig,
    rng: StdRng,
    gaps: Uniform<u64>,
}

impl InputStorm {
    pub fn new(config: StormConfig, seed: u64) -> Self {
        let gaps = Uniform::new_inclusive(
            config.min_gap.as_millis() as u64,
            config.max_gap.as_millis().max(config.min_gap.as_millis()) as u64,
        );
        InputStorm {
            config,
            rng: StdRng::seed_from_u64(seed),
            gaps,
        }
    }

    /// Next input
    pub fn next_event(&mut self) -> StormEvent {
        let after = Duration::from_millis(self.gaps.sample(&mut self.rng));
        let roll: f64 = self.rng.gen();

        let action = if roll < self.config.abort_prob {
            StormAction::Abort
        } else if roll < self.config.abort_prob + self.config.dispose_prob {
            StormAction::DisposeScene
        } else {
            StormAction::Request(self.random_request())
        };
        StormEvent { after, action }
    }

    /// The next `n` inputs
    pub fn take(&mut self, n: usize) -> Vec<StormEvent> {
        (0..n).map(|_| self.next_event()).collect()
    }

    fn random_request(&mut self) -> TransitionRequest {
        let request = match self.rng.gen_range(0..5) {
            0 => TransitionRequest::new(ViewLevel::Overview, None),
            1 => TransitionRequest::new(ViewLevel::Mid, Some(sol())),
            2 => TransitionRequest::new(ViewLevel::Mid, Some(vega())),
            3 => TransitionRequest::new(ViewLevel::Detail, Some(earth())),
            // Not on the map: exercises the prefetch failure path
            _ => TransitionRequest::new(
                ViewLevel::Detail,
                Some(parallax_core::EntityRef::new("pluto", ViewLevel::Detail)),
            ),
        };
        if self.rng.gen::<f64>() < self.config.carry_prob {
            request.carry_selection()
        } else {
            request
        }
    }
}
