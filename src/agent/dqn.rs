//! Deep Q-network agent: online and target networks over the state feature
//! vector, experience replay, epsilon-greedy exploration restricted to the
//! legal action set.

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
use crate::network::{layer_dims, QNetwork};
use crate::optimizer::{Adam, OptimizerWrapper};
use crate::replay_buffer::{ReplayBuffer, Transition};

/// Target-network synchronization policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TargetSync {
    /// Copy the online weights every `every` training steps
    Hard { every: usize },
    /// Exponential moving average toward the online weights each step
    Soft { tau: f32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqnConfig {
    pub hidden_sizes: Vec<usize>,
    pub gamma: f32,
    pub learning_rate: f32,
    pub batch_size: usize,
    /// Learning updates start once the buffer holds this many transitions
    pub min_fill: usize,
    pub buffer_capacity: usize,
    pub target_sync: TargetSync,
    pub epsilon: f64,
    pub schedule: EpsilonSchedule,
    pub seed: u64,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            hidden_sizes: vec![64, 64],
            gamma: 0.9,
            learning_rate: 1e-3,
            batch_size: 32,
            min_fill: 500,
            buffer_capacity: 10_000,
            target_sync: TargetSync::Hard { every: 500 },
            epsilon: 0.9,
            schedule: EpsilonSchedule::Exponential {
                factor: 1.0 - 1e-5,
                floor: 0.05,
            },
            seed: 0,
        }
    }
}

pub struct DqnAgent {
    codec: StateCodec,
    config: DqnConfig,
    pub online: QNetwork,
    pub target: QNetwork,
    buffer: ReplayBuffer,
    epsilon: f64,
    greedy: bool,
    train_steps: usize,
    rng: StdRng,
}

/// Persisted form of a trained DQN policy. Binary via bincode, like the
/// network weights themselves.
#[derive(Serialize, Deserialize)]
struct DqnCheckpoint {
    codec: StateCodec,
    config: DqnConfig,
    online: QNetwork,
    target: QNetwork,
    epsilon: f64,
    train_steps: usize,
}

impl DqnAgent {
    pub fn new(codec: StateCodec, mut config: DqnConfig) -> Self {
        // an under-filled buffer is skipped, never sampled short
        config.min_fill = config.min_fill.max(config.batch_size);
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut sizes = Vec::with_capacity(config.hidden_sizes.len() + 2);
        sizes.push(codec.feature_len());
        sizes.extend_from_slice(&config.hidden_sizes);
        sizes.push(Action::COUNT);

        let optimizer = OptimizerWrapper::Adam(Adam::default_for(&layer_dims(&sizes)));
        let online = QNetwork::new(&sizes, optimizer, &mut rng);
        let target = online.clone();
        let buffer = ReplayBuffer::new(config.buffer_capacity);
        let epsilon = config.epsilon;

        DqnAgent {
            codec,
            config,
            online,
            target,
            buffer,
            epsilon,
            greedy: false,
            train_steps: 0,
            rng,
        }
    }

    pub fn codec(&self) -> StateCodec {
        self.codec
    }

    pub fn train_steps(&self) -> usize {
        self.train_steps
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Highest-valued legal action under the online network, ties broken by
    /// the fixed action order.
    pub fn greedy_action(&self, obs: &Observation, legal: &[Action]) -> Action {
        let q = self.online.predict(self.codec.features(obs).view());
        let mut best = legal[0];
        let mut best_value = q[best.index()];
        for &action in &legal[1..] {
            let value = q[action.index()];
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// One minibatch TD update: targets come from the target network,
    /// `r + gamma * max_a' Q_target(s', a') * (1 - done)`.
    fn train_step(&mut self) -> Result<f32> {
        let batch_size = self.config.batch_size;
        let dim = self.codec.feature_len();

        let (states, actions, rewards, next_states, dones) = {
            let batch = self.buffer.sample(batch_size, &mut self.rng)?;
            let mut states = Array2::zeros((batch_size, dim));
            let mut next_states = Array2::zeros((batch_size, dim));
            let mut actions = Vec::with_capacity(batch_size);
            let mut rewards = Vec::with_capacity(batch_size);
            let mut dones = Vec::with_capacity(batch_size);
            for (i, transition) in batch.iter().enumerate() {
                states.row_mut(i).assign(&transition.state);
                next_states.row_mut(i).assign(&transition.next_state);
                actions.push(transition.action);
                rewards.push(transition.reward);
                dones.push(transition.done);
            }
            (states, actions, rewards, next_states, dones)
        };

        let next_q = self.target.predict_batch(next_states.view());
        let mut targets = self.online.predict_batch(states.view());
        for i in 0..batch_size {
            let target = if dones[i] {
                rewards[i]
            } else {
                let max_next = next_q
                    .row(i)
                    .iter()
                    .fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                rewards[i] + self.config.gamma * max_next
            };
            targets[[i, actions[i]]] = target;
        }

        let loss = self
            .online
            .fit_batch(states.view(), targets.view(), self.config.learning_rate);
        self.train_steps += 1;

        match self.config.target_sync {
            TargetSync::Hard { every } => {
                if every > 0 && self.train_steps % every == 0 {
                    self.target.copy_weights_from(&self.online);
                }
            }
            TargetSync::Soft { tau } => {
                self.target.blend_weights_from(&self.online, tau);
            }
        }

        Ok(loss)
    }

    /// Load a checkpoint. Architecture and state space are validated before
    /// anything is kept; a mismatched file is rejected whole.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let ckpt: DqnCheckpoint = bincode::deserialize(&bytes)?;

        let arch = ckpt.online.architecture();
        if arch.first() != Some(&ckpt.codec.feature_len())
            || arch.last() != Some(&Action::COUNT)
        {
            return Err(SkyrelayError::CheckpointFormat(format!(
                "network architecture {:?} does not fit a {}-feature, {}-action policy",
                arch,
                ckpt.codec.feature_len(),
                Action::COUNT
            )));
        }
        if ckpt.target.architecture() != arch {
            return Err(SkyrelayError::CheckpointFormat(
                "online and target networks disagree on architecture".to_string(),
            ));
        }

        let rng = StdRng::seed_from_u64(ckpt.config.seed);
        let buffer = ReplayBuffer::new(ckpt.config.buffer_capacity);
        Ok(DqnAgent {
            codec: ckpt.codec,
            online: ckpt.online,
            target: ckpt.target,
            buffer,
            epsilon: ckpt.epsilon,
            greedy: false,
            train_steps: ckpt.train_steps,
            rng,
            config: ckpt.config,
        })
    }
}

impl Agent for DqnAgent {
    fn name(&self) -> &str {
        "DQN"
    }

    fn select_action(&mut self, obs: &Observation, legal: &[Action]) -> Action {
        let action = if !self.greedy && self.rng.gen::<f64>() < self.epsilon {
            *legal.choose(&mut self.rng).unwrap_or(&Action::Up)
        } else {
            self.greedy_action(obs, legal)
        };
        if !self.greedy {
            self.epsilon = self.config.schedule.decay(self.epsilon);
        }
        action
    }

    fn observe(
        &mut self,
        obs: &Observation,
        action: Action,
        reward: f64,
        next_obs: &Observation,
        _next_legal: &[Action],
        done: bool,
    ) -> Result<()> {
        self.buffer.push(Transition {
            state: self.codec.features(obs),
            action: action.index(),
            reward: reward as f32,
            next_state: self.codec.features(next_obs),
            done,
        });

        if self.buffer.len() < self.config.min_fill {
            // not enough experience yet, skip the update
            return Ok(());
        }
        match self.train_step() {
            Ok(_) => Ok(()),
            Err(SkyrelayError::ReplayBufferUnderflow { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn episode_end(&mut self) {}

    fn set_greedy(&mut self, greedy: bool) -> bool {
        let previous = self.greedy;
        self.greedy = greedy;
        previous
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn save(&self, path: &Path) -> Result<()> {
        let ckpt = DqnCheckpoint {
            codec: self.codec,
            config: self.config.clone(),
            online: self.online.clone(),
            target: self.target.clone(),
            epsilon: self.epsilon,
            train_steps: self.train_steps,
        };
        let bytes = bincode::serialize(&ckpt)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
