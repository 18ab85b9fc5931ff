//! Learning agents: the seam the training loop drives, plus the exploration
//! schedule both learners share.

pub mod dqn;
pub mod tabular;

pub use dqn::{DqnAgent, DqnConfig, TargetSync};
pub use tabular::QLearningAgent;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::env::{Action, Observation};
use crate::error::Result;

/// Decision-making contract consumed by the training loop. Implementations
/// own their learned parameters and their exploration state.
pub trait Agent {
    fn name(&self) -> &str;

    /// Pick an action for the observed state. `legal` is never empty for
    /// reachable cells; exploration draws uniformly from it.
    fn select_action(&mut self, obs: &Observation, legal: &[Action]) -> Action;

    /// Feed one transition back into the learning update. `next_legal` is
    /// the legal action set at the successor state, used to bound the
    /// bootstrap maximum.
    fn observe(
        &mut self,
        obs: &Observation,
        action: Action,
        reward: f64,
        next_obs: &Observation,
        next_legal: &[Action],
        done: bool,
    ) -> Result<()>;

    /// Called once per finished episode.
    fn episode_end(&mut self);

    /// Toggle greedy (no-exploration) mode; returns the previous setting so
    /// callers can restore it after an evaluation probe.
    fn set_greedy(&mut self, greedy: bool) -> bool;

    fn epsilon(&self) -> f64;

    /// Persist the learned parameters to disk.
    fn save(&self, path: &Path) -> Result<()>;
}

/// Exploration-rate decay applied after every training-mode action
/// selection. Greedy mode freezes the rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EpsilonSchedule {
    /// No decay
    Fixed,
    /// Subtract `step` per selection, down to `floor`
    Linear { step: f64, floor: f64 },
    /// Multiply by `factor` per selection, down to `floor`
    Exponential { factor: f64, floor: f64 },
}

impl EpsilonSchedule {
    pub fn decay(&self, epsilon: f64) -> f64 {
        match *self {
            EpsilonSchedule::Fixed => epsilon,
            EpsilonSchedule::Linear { step, floor } => (epsilon - step).max(floor),
            EpsilonSchedule::Exponential { factor, floor } => (epsilon * factor).max(floor),
        }
    }
}
