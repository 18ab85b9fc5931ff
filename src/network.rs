//! Minimal fully-connected Q-value network on `ndarray`.
//!
//! Forward passes are pure; `fit_batch` runs one backpropagation step toward
//! the given targets under the configured optimizer. Hard and soft target
//! synchronization are provided for the DQN's target network.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::optimizer::{Optimizer, OptimizerWrapper};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Linear => z.clone(),
        }
    }

    /// Elementwise derivative evaluated at the pre-activation values.
    fn derivative(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(z.dim()),
        }
    }
}

/// One fully connected layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

impl Dense {
    /// Scaled-uniform initialization, drawn from the supplied RNG so network
    /// construction is reproducible under a fixed seed.
    pub fn new(input_size: usize, output_size: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (1.0 / input_size as f32).sqrt();
        Dense {
            weights: Array2::random_using((input_size, output_size), Uniform::new(-limit, limit), rng),
            biases: Array1::zeros(output_size),
            activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Returns (pre-activation, activation) for a batch of inputs.
    fn forward(&self, inputs: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
        let z = inputs.dot(&self.weights) + &self.biases;
        let a = self.activation.apply(&z);
        (z, a)
    }
}

/// Feed-forward action-value network: ReLU hidden layers, linear output,
/// one output unit per action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QNetwork {
    pub layers: Vec<Dense>,
    optimizer: OptimizerWrapper,
}

/// (input, output) dimensions of each layer for an architecture, used to
/// size optimizer state.
pub fn layer_dims(sizes: &[usize]) -> Vec<(usize, usize)> {
    sizes.windows(2).map(|w| (w[0], w[1])).collect()
}

impl QNetwork {
    /// Build from consecutive layer sizes, e.g. `[3, 64, 64, 4]`.
    pub fn new(sizes: &[usize], optimizer: OptimizerWrapper, rng: &mut StdRng) -> Self {
        assert!(sizes.len() >= 2, "network needs input and output sizes");
        let last = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let activation = if i == last { Activation::Linear } else { Activation::Relu };
                Dense::new(w[0], w[1], activation, rng)
            })
            .collect();
        QNetwork { layers, optimizer }
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.output_size()).unwrap_or(0)
    }

    /// Consecutive layer sizes, the inverse of `new`.
    pub fn architecture(&self) -> Vec<usize> {
        let mut sizes = vec![self.input_size()];
        sizes.extend(self.layers.iter().map(|l| l.output_size()));
        sizes
    }

    /// Action values for a batch of states.
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let (_, a) = layer.forward(&current);
            current = a;
        }
        current
    }

    /// Action values for a single state.
    pub fn predict(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let batch = input.insert_axis(Axis(0));
        let out = self.predict_batch(batch);
        out.index_axis(Axis(0), 0).to_owned()
    }

    /// One backpropagation step toward `targets`; returns the pre-update
    /// mean squared error.
    pub fn fit_batch(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>, learning_rate: f32) -> f32 {
        // forward, keeping each layer's input and pre-activation
        let mut layer_inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let (z, a) = layer.forward(&current);
            layer_inputs.push(current);
            pre_activations.push(z);
            current = a;
        }

        let diff = &current - &targets;
        let loss = diff.mapv(|e| e * e).mean().unwrap_or(f32::INFINITY);

        // backward
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut error = diff;
        for i in (0..self.layers.len()).rev() {
            let delta = &error * &self.layers[i].activation.derivative(&pre_activations[i]);
            let weight_grads = layer_inputs[i].t().dot(&delta);
            let bias_grads = delta.sum_axis(Axis(0));
            if i > 0 {
                error = delta.dot(&self.layers[i].weights.t());
            }
            gradients.push((weight_grads, bias_grads));
        }
        gradients.reverse();

        for (i, (layer, (wg, bg))) in self.layers.iter_mut().zip(gradients).enumerate() {
            self.optimizer
                .step(i, &mut layer.weights, &mut layer.biases, &wg, &bg, learning_rate);
        }

        loss
    }

    /// Hard target sync: copy all parameters from `other`.
    pub fn copy_weights_from(&mut self, other: &QNetwork) {
        for (dst, src) in self.layers.iter_mut().zip(&other.layers) {
            dst.weights.assign(&src.weights);
            dst.biases.assign(&src.biases);
        }
    }

    /// Soft target sync: exponential moving average toward `other` with
    /// blend factor `tau` (1.0 copies outright).
    pub fn blend_weights_from(&mut self, other: &QNetwork, tau: f32) {
        for (dst, src) in self.layers.iter_mut().zip(&other.layers) {
            dst.weights
                .zip_mut_with(&src.weights, |t, &o| *t = tau * o + (1.0 - tau) * *t);
            dst.biases
                .zip_mut_with(&src.biases, |t, &o| *t = tau * o + (1.0 - tau) * *t);
        }
    }
}
