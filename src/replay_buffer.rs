//! Bounded experience replay with uniform minibatch sampling.

use std::collections::VecDeque;

use ndarray::Array1;
use rand::rngs::StdRng;

use crate::error::{Result, SkyrelayError};

/// One environment transition in feature space, the unit consumed by the
/// approximate agent's learning update.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// FIFO buffer of transitions with a fixed capacity.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a transition, evicting the oldest one at capacity.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Uniform sample without replacement. Errors when fewer than
    /// `batch_size` transitions are stored; callers decide whether that
    /// means "skip this update" or a bug.
    pub fn sample(&self, batch_size: usize, rng: &mut StdRng) -> Result<Vec<&Transition>> {
        if self.buffer.len() < batch_size {
            return Err(SkyrelayError::ReplayBufferUnderflow {
                len: self.buffer.len(),
                requested: batch_size,
            });
        }
        let indices = rand::seq::index::sample(rng, self.buffer.len(), batch_size);
        Ok(indices.into_iter().map(|i| &self.buffer[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
