//! Tabular Q-learning over the bounded grid state space.
//!
//! The table is dense (`num_states x num_actions`), pre-sized from the state
//! codec instead of grown lazily: the state space is small and bounded, and
//! a dense table makes the checkpoint layout and greedy tie-breaking exact.

use std::fs;
use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, EpsilonSchedule};
use crate::env::{Action, Observation, StateCodec};
use crate::error::{Result, SkyrelayError};

/// Off-policy temporal-difference learner with an epsilon-greedy behavior
/// policy.
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    codec: StateCodec,
    q: Array2<f64>,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    schedule: EpsilonSchedule,
    greedy: bool,
    episodes_trained: u64,
    rng: StdRng,
    seed: u64,
}

/// On-disk layout of a tabular policy checkpoint. JSON, so a trained table
/// stays inspectable.
#[derive(Serialize, Deserialize)]
struct TabularCheckpoint {
    codec: StateCodec,
    num_actions: usize,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    schedule: EpsilonSchedule,
    episodes_trained: u64,
    seed: u64,
    /// Row-major `num_states x num_actions` values
    values: Vec<f64>,
}

impl QLearningAgent {
    pub fn new(codec: StateCodec, alpha: f64, gamma: f64, epsilon: f64, schedule: EpsilonSchedule) -> Self {
        let seed = rand::thread_rng().gen();
        QLearningAgent {
            codec,
            q: Array2::zeros((codec.num_states(), Action::COUNT)),
            alpha,
            gamma,
            epsilon,
            schedule,
            greedy: false,
            episodes_trained: 0,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Fix the exploration RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
        self
    }

    pub fn codec(&self) -> StateCodec {
        self.codec
    }

    pub fn episodes_trained(&self) -> u64 {
        self.episodes_trained
    }

    pub fn q_value(&self, state: usize, action: Action) -> f64 {
        self.q[[state, action.index()]]
    }

    pub fn set_q_value(&mut self, state: usize, action: Action, value: f64) {
        self.q[[state, action.index()]] = value;
    }

    /// Highest-valued legal action; ties broken by the fixed action order so
    /// a reloaded table reproduces the same policy.
    pub fn greedy_action(&self, state: usize, legal: &[Action]) -> Action {
        let mut best = legal[0];
        let mut best_value = self.q[[state, best.index()]];
        for &action in &legal[1..] {
            let value = self.q[[state, action.index()]];
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    fn max_q(&self, state: usize, legal: &[Action]) -> f64 {
        legal
            .iter()
            .map(|a| self.q[[state, a.index()]])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Load a checkpoint, reconstructing the exact greedy policy. Fails with
    /// `CheckpointFormat` when the stored table does not match its declared
    /// state/action space; never partially loads.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let ckpt: TabularCheckpoint = serde_json::from_str(&text)?;
        if ckpt.num_actions != Action::COUNT {
            return Err(SkyrelayError::CheckpointFormat(format!(
                "checkpoint has {} actions, expected {}",
                ckpt.num_actions,
                Action::COUNT
            )));
        }
        let expected = ckpt.codec.num_states() * ckpt.num_actions;
        if ckpt.values.len() != expected {
            return Err(SkyrelayError::CheckpointFormat(format!(
                "checkpoint holds {} values, expected {} for its state space",
                ckpt.values.len(),
                expected
            )));
        }
        let q = Array2::from_shape_vec((ckpt.codec.num_states(), ckpt.num_actions), ckpt.values)
            .map_err(|e| SkyrelayError::CheckpointFormat(e.to_string()))?;
        Ok(QLearningAgent {
            codec: ckpt.codec,
            q,
            alpha: ckpt.alpha,
            gamma: ckpt.gamma,
            epsilon: ckpt.epsilon,
            schedule: ckpt.schedule,
            greedy: false,
            episodes_trained: ckpt.episodes_trained,
            rng: StdRng::seed_from_u64(ckpt.seed),
            seed: ckpt.seed,
        })
    }
}

impl Agent for QLearningAgent {
    fn name(&self) -> &str {
        "Q-Learning"
    }

    fn select_action(&mut self, obs: &Observation, legal: &[Action]) -> Action {
        let state = self.codec.index(obs);
        let action = if !self.greedy && self.rng.gen::<f64>() < self.epsilon {
            *legal.choose(&mut self.rng).unwrap_or(&Action::Up)
        } else {
            self.greedy_action(state, legal)
        };
        if !self.greedy {
            self.epsilon = self.schedule.decay(self.epsilon);
        }
        action
    }

    fn observe(
        &mut self,
        obs: &Observation,
        action: Action,
        reward: f64,
        next_obs: &Observation,
        next_legal: &[Action],
        done: bool,
    ) -> Result<()> {
        let s = self.codec.index(obs);
        let s_next = self.codec.index(next_obs);
        let bootstrap = if done || next_legal.is_empty() {
            0.0
        } else {
            self.max_q(s_next, next_legal)
        };
        let current = self.q[[s, action.index()]];
        let td_target = reward + self.gamma * bootstrap;
        self.q[[s, action.index()]] = current + self.alpha * (td_target - current);
        Ok(())
    }

    fn episode_end(&mut self) {
        self.episodes_trained += 1;
    }

    fn set_greedy(&mut self, greedy: bool) -> bool {
        let previous = self.greedy;
        self.greedy = greedy;
        previous
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn save(&self, path: &Path) -> Result<()> {
        let ckpt = TabularCheckpoint {
            codec: self.codec,
            num_actions: Action::COUNT,
            alpha: self.alpha,
            gamma: self.gamma,
            epsilon: self.epsilon,
            schedule: self.schedule,
            episodes_trained: self.episodes_trained,
            seed: self.seed,
            values: self.q.iter().copied().collect(),
        };
        let text = serde_json::to_string(&ckpt)?;
        fs::write(path, text)?;
        Ok(())
    }
}
