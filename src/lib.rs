//! # Skyrelay - RL Trajectory Optimization for an Aerial Relay
//!
//! Skyrelay trains an agent to pilot an aerial relay over a fixed-horizon
//! mission on a discretized 2-D map. The relay serves two fixed ground
//! terminals through a line-of-sight-dependent channel and must be back on
//! its launch cell when the flight time runs out; reward shaping encodes
//! the on-time-return requirement, and two learners (tabular Q-learning and
//! a DQN) learn policies over the resulting environment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skyrelay::agent::{Agent, EpsilonSchedule, QLearningAgent};
//! use skyrelay::env::{RelayEnv, StateMode};
//! use skyrelay::train::{Trainer, TrainerConfig};
//!
//! // Reference scenario: 15x15 map, 50-step missions
//! let mut env = RelayEnv::reference(StateMode::Stateful);
//!
//! // Tabular learner over the (position, time) state space
//! let schedule = EpsilonSchedule::Exponential { factor: 1.0 - 1e-8, floor: 0.05 };
//! let mut agent = QLearningAgent::new(env.codec(), 0.3, 0.9, 0.9, schedule).with_seed(7);
//!
//! let mut trainer = Trainer::new(&mut env, &mut agent, TrainerConfig::default());
//! let report = trainer.run().unwrap();
//! println!("on-time returns: {}", report.on_time_returns);
//! ```
//!
//! ## Module Organization
//!
//! - [`map`] - Static grid map, obstacle layout, terminals, geometry
//! - [`channel`] - LOS classification and Shannon-rate model
//! - [`env`] - Episode state machine with finite-horizon reward shaping
//! - [`agent`] - Learners: tabular Q-learning and DQN
//! - [`network`] - Feed-forward Q-value network
//! - [`optimizer`] - SGD and Adam
//! - [`replay_buffer`] - Experience replay for the DQN
//! - [`train`] - Training loop, greedy evaluation, checkpointing
//! - [`error`] - Error types and result handling

pub mod agent;
pub mod channel;
pub mod env;
pub mod error;
pub mod map;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod train;

pub use error::{Result, SkyrelayError};

#[cfg(test)]
mod tests;
