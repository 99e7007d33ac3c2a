//! Optimization Algorithms
//!
//! - SGD (Stochastic Gradient Descent) with optional momentum
//! - Adam (Adaptive Moment Estimation)
//!
//! Both apply L2 weight decay by adding `weight_decay * param` to the
//! gradient. State is kept per parameter slot; the model hands out one slot
//! per parameter tensor and calls `next_step` once per batch.

use ndarray::{Array, Array1, Array2, Dimension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::{OptimizerKind, TrainingConfig};

/// Optimizer trait for parameter updates
pub trait Optimizer: Send {
    /// Start a new optimisation step (one mini-batch)
    fn next_step(&mut self);

    /// Update a matrix parameter
    fn update_matrix(&mut self, slot: usize, param: &mut Array2<f64>, grad: &Array2<f64>);

    /// Update a vector parameter
    fn update_vector(&mut self, slot: usize, param: &mut Array1<f64>, grad: &Array1<f64>);

    /// Reset optimizer state (for new training run)
    fn reset(&mut self);

    fn learning_rate(&self) -> f64;
}

/// Build the optimizer selected in the training config
pub fn build_optimizer(config: &TrainingConfig) -> Box<dyn Optimizer> {
    match config.optimizer {
        OptimizerKind::Adam => Box::new(
            Adam::new(config.learning_rate).with_weight_decay(config.weight_decay),
        ),
        OptimizerKind::Sgd => Box::new(
            SGD::new(config.learning_rate)
                .with_momentum(config.momentum)
                .with_weight_decay(config.weight_decay),
        ),
    }
}

fn decayed<D: Dimension>(grad: &Array<f64, D>, param: &Array<f64, D>, weight_decay: f64) -> Array<f64, D> {
    let mut g = grad.clone();
    if weight_decay > 0.0 {
        g.scaled_add(weight_decay, param);
    }
    g
}

/// Stochastic Gradient Descent with optional momentum
#[derive(Clone, Serialize, Deserialize)]
pub struct SGD {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    #[serde(skip)]
    velocity_w: HashMap<usize, Array2<f64>>,
    #[serde(skip)]
    velocity_b: HashMap<usize, Array1<f64>>,
}

impl SGD {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            momentum: 0.0,
            weight_decay: 0.0,
            velocity_w: HashMap::new(),
            velocity_b: HashMap::new(),
        }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for SGD {
    fn next_step(&mut self) {}

    fn update_matrix(&mut self, slot: usize, weights: &mut Array2<f64>, gradients: &Array2<f64>) {
        let g = decayed(gradients, weights, self.weight_decay);
        if self.momentum > 0.0 {
            let v = self
                .velocity_w
                .entry(slot)
                .or_insert_with(|| Array2::zeros(weights.dim()));
            *v = &*v * self.momentum + &g;
            weights.scaled_add(-self.learning_rate, v);
        } else {
            weights.scaled_add(-self.learning_rate, &g);
        }
    }

    fn update_vector(&mut self, slot: usize, biases: &mut Array1<f64>, gradients: &Array1<f64>) {
        let g = decayed(gradients, biases, self.weight_decay);
        if self.momentum > 0.0 {
            let v = self
                .velocity_b
                .entry(slot)
                .or_insert_with(|| Array1::zeros(biases.len()));
            *v = &*v * self.momentum + &g;
            biases.scaled_add(-self.learning_rate, v);
        } else {
            biases.scaled_add(-self.learning_rate, &g);
        }
    }

    fn reset(&mut self) {
        self.velocity_w.clear();
        self.velocity_b.clear();
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

/// First and second moment estimates of one parameter
#[derive(Clone)]
struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

/// Adam optimizer (Adaptive Moment Estimation)
#[derive(Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub weight_decay: f64,
    #[serde(skip)]
    t: i32,
    #[serde(skip)]
    matrices: HashMap<usize, Moments<ndarray::Ix2>>,
    #[serde(skip)]
    vectors: HashMap<usize, Moments<ndarray::Ix1>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
            t: 0,
            matrices: HashMap::new(),
            vectors: HashMap::new(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    fn apply<D: Dimension>(
        &self,
        moments: &mut Moments<D>,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
    ) {
        let t = self.t.max(1);
        let g = decayed(grad, param, self.weight_decay);

        let (beta1, beta2) = (self.beta1, self.beta2);
        let bc1 = 1.0 - beta1.powi(t);
        let bc2 = 1.0 - beta2.powi(t);
        let eps = self.epsilon;
        let lr = self.learning_rate;

        ndarray::Zip::from(param)
            .and(&mut moments.m)
            .and(&mut moments.v)
            .and(&g)
            .for_each(|p, m, v, &g| {
                // biased moment estimates
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;

                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

impl Optimizer for Adam {
    fn next_step(&mut self) {
        self.t += 1;
    }

    fn update_matrix(&mut self, slot: usize, weights: &mut Array2<f64>, gradients: &Array2<f64>) {
        let mut moments = self.matrices.remove(&slot).unwrap_or_else(|| Moments {
            m: Array2::zeros(weights.dim()),
            v: Array2::zeros(weights.dim()),
        });
        self.apply(&mut moments, weights, gradients);
        self.matrices.insert(slot, moments);
    }

    fn update_vector(&mut self, slot: usize, biases: &mut Array1<f64>, gradients: &Array1<f64>) {
        let mut moments = self.vectors.remove(&slot).unwrap_or_else(|| Moments {
            m: Array1::zeros(biases.len()),
            v: Array1::zeros(biases.len()),
        });
        self.apply(&mut moments, biases, gradients);
        self.vectors.insert(slot, moments);
    }

    fn reset(&mut self) {
        self.t = 0;
        self.matrices.clear();
        self.vectors.clear();
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
