//! Episode-sequential training loop and greedy evaluator.
//!
//! Single-threaded by design: the environment, the agent's parameters and
//! the replay buffer are exclusively owned here and nothing suspends
//! mid-episode.

use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::env::{RelayEnv, StateMode};
use crate::error::Result;

/// Which learner to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    QLearning,
    Dqn,
}

/// Train from scratch (or a loaded checkpoint) vs. evaluate a checkpoint
/// greedily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Train,
    Evaluate,
}

/// The run-mode switch handed over by the command-line layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub algorithm: Algorithm,
    pub mode: RunMode,
    pub state_mode: StateMode,
}

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub episodes: usize,
    /// Run a greedy probe episode and log every this many episodes (0 = off)
    pub log_interval: usize,
    /// Write the agent's parameters every this many episodes (0 = off)
    pub checkpoint_interval: usize,
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            episodes: 10_000,
            log_interval: 1_000,
            checkpoint_interval: 0,
            checkpoint_path: None,
        }
    }
}

/// Outcome of one full episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    /// Total shaped reward accumulated over the episode
    pub reward: f64,
    /// Step count when the episode ended
    pub flight_time: usize,
    /// True when the relay was back on the landing cell at the horizon
    pub returned_on_time: bool,
}

/// Greedy probe taken during training, tagged with the episode it followed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub episode: usize,
    pub outcome: EpisodeOutcome,
    pub epsilon: f64,
}

/// Summary of a training run.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub episodes: usize,
    /// Shaped reward per training episode
    pub episode_rewards: Vec<f64>,
    /// On-time returns among training episodes
    pub on_time_returns: usize,
    /// Periodic greedy probes
    pub probes: Vec<Probe>,
}

/// Drives episodes against the environment with a single agent.
pub struct Trainer<'a, A: Agent> {
    env: &'a mut RelayEnv,
    agent: &'a mut A,
    config: TrainerConfig,
}

impl<'a, A: Agent> Trainer<'a, A> {
    pub fn new(env: &'a mut RelayEnv, agent: &'a mut A, config: TrainerConfig) -> Self {
        Trainer { env, agent, config }
    }

    /// Train for the configured number of episodes.
    pub fn run(&mut self) -> Result<TrainingReport> {
        let mut report = TrainingReport {
            episodes: self.config.episodes,
            episode_rewards: Vec::with_capacity(self.config.episodes),
            ..TrainingReport::default()
        };

        info!(
            "training {} for {} episodes ({} steps each)",
            self.agent.name(),
            self.config.episodes,
            self.env.horizon()
        );

        for episode in 1..=self.config.episodes {
            let outcome = run_episode(self.env, self.agent, true)?;
            self.agent.episode_end();
            if outcome.returned_on_time {
                report.on_time_returns += 1;
            }
            report.episode_rewards.push(outcome.reward);

            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                let probe = greedy_episode(self.env, self.agent)?;
                info!(
                    "episode {}: greedy reward = {:.2}, epsilon = {:.4}, flight time = {}{}",
                    episode,
                    probe.reward,
                    self.agent.epsilon(),
                    probe.flight_time,
                    if probe.returned_on_time { " (returned on time)" } else { "" }
                );
                report.probes.push(Probe {
                    episode,
                    outcome: probe,
                    epsilon: self.agent.epsilon(),
                });
            }

            if self.config.checkpoint_interval > 0
                && episode % self.config.checkpoint_interval == 0
            {
                if let Some(path) = &self.config.checkpoint_path {
                    self.agent.save(path)?;
                    debug!("checkpoint written to {} after episode {}", path.display(), episode);
                }
            }
        }

        if let Some(path) = &self.config.checkpoint_path {
            self.agent.save(path)?;
            info!("final checkpoint written to {}", path.display());
        }

        Ok(report)
    }

    /// Evaluate the current parameters greedily over several episodes.
    /// Deterministic dynamics make repeated episodes identical; multiple
    /// episodes only matter for agents whose greedy policy changed between
    /// calls.
    pub fn evaluate(&mut self, episodes: usize) -> Result<Vec<EpisodeOutcome>> {
        (0..episodes)
            .map(|_| greedy_episode(self.env, self.agent))
            .collect()
    }
}

/// Run one episode. With `learn` set, every transition is fed back into the
/// agent's update.
pub fn run_episode<A: Agent>(env: &mut RelayEnv, agent: &mut A, learn: bool) -> Result<EpisodeOutcome> {
    let mut obs = env.reset();
    let mut total = 0.0;
    let mut returned_on_time = false;

    loop {
        let legal = env.legal_actions(obs.cell);
        let action = agent.select_action(&obs, &legal);
        let step = env.step(action);
        total += step.reward;

        if learn {
            let next_legal = env.legal_actions(step.obs.cell);
            agent.observe(&obs, action, step.reward, &step.obs, &next_legal, step.done())?;
        }

        obs = step.obs;
        if step.done() {
            returned_on_time = step.terminated;
            break;
        }
    }

    Ok(EpisodeOutcome {
        reward: total,
        flight_time: obs.step,
        returned_on_time,
    })
}

/// Run one episode with exploration disabled and no learning, restoring the
/// agent's exploration setting afterwards.
pub fn greedy_episode<A: Agent>(env: &mut RelayEnv, agent: &mut A) -> Result<EpisodeOutcome> {
    let previous = agent.set_greedy(true);
    let outcome = run_episode(env, agent, false);
    agent.set_greedy(previous);
    outcome
}
