//! Gradient-descent optimizers for the Q-network.
//!
//! Optimizers keep any per-layer state (Adam moments) indexed by the layer
//! slot they were registered for at construction.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub trait Optimizer {
    /// Apply one gradient step to the given layer's parameters.
    fn step(
        &mut self,
        layer: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_grads: &Array2<f32>,
        bias_grads: &Array1<f32>,
        learning_rate: f32,
    );
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum OptimizerWrapper {
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn step(
        &mut self,
        layer: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_grads: &Array2<f32>,
        bias_grads: &Array1<f32>,
        learning_rate: f32,
    ) {
        match self {
            OptimizerWrapper::Sgd(o) => {
                o.step(layer, weights, biases, weight_grads, bias_grads, learning_rate)
            }
            OptimizerWrapper::Adam(o) => {
                o.step(layer, weights, biases, weight_grads, bias_grads, learning_rate)
            }
        }
    }
}

/// Plain stochastic gradient descent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sgd;

impl Sgd {
    pub fn new() -> Sgd {
        Sgd
    }
}

impl Optimizer for Sgd {
    fn step(
        &mut self,
        _layer: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_grads: &Array2<f32>,
        bias_grads: &Array1<f32>,
        learning_rate: f32,
    ) {
        weights.zip_mut_with(weight_grads, |w, &g| *w -= learning_rate * g);
        biases.zip_mut_with(bias_grads, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with bias-corrected first and second moments, one set per layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Per-layer update counter for bias correction
    t: Vec<u32>,
}

impl Adam {
    /// `layer_dims` is the (input, output) size of each layer, in order.
    pub fn new(layer_dims: &[(usize, usize)], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: layer_dims.iter().map(|&(i, o)| Array2::zeros((i, o))).collect(),
            v_weights: layer_dims.iter().map(|&(i, o)| Array2::zeros((i, o))).collect(),
            m_biases: layer_dims.iter().map(|&(_, o)| Array1::zeros(o)).collect(),
            v_biases: layer_dims.iter().map(|&(_, o)| Array1::zeros(o)).collect(),
            t: vec![0; layer_dims.len()],
        }
    }

    pub fn default_for(layer_dims: &[(usize, usize)]) -> Self {
        Adam::new(layer_dims, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(
        &mut self,
        layer: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_grads: &Array2<f32>,
        bias_grads: &Array1<f32>,
        learning_rate: f32,
    ) {
        self.t[layer] += 1;
        let t = self.t[layer] as i32;
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let bc1 = 1.0 - beta1.powi(t);
        let bc2 = 1.0 - beta2.powi(t);

        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];
        m.zip_mut_with(weight_grads, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(weight_grads, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
        ndarray::Zip::from(&mut *weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| {
                *w -= learning_rate * (m / bc1) / ((v / bc2).sqrt() + eps);
            });

        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];
        m.zip_mut_with(bias_grads, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(bias_grads, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
        ndarray::Zip::from(&mut *biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| {
                *b -= learning_rate * (m / bc1) / ((v / bc2).sqrt() + eps);
            });
    }
}
