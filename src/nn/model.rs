//! Tabular model with categorical embeddings
//!
//! Embedded categorical columns are concatenated with batch-normalised
//! continuous columns and fed through a stack of dense blocks
//! (dense -> relu -> dropout -> batch norm) and a linear output layer.

use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

use super::activation::{softmax, ActivationType};
use super::batch_norm::BatchNorm1d;
use super::dropout::Dropout;
use super::embedding::Embedding;
use super::layer::DenseLayer;
use super::optimizer::Optimizer;
use crate::error::{Error, Result};
use crate::utils::ModelConfig;

fn default_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

/// Feed-forward classifier over embedded categorical and continuous inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularModel {
    pub embeddings: Vec<Embedding>,
    pub embedding_dropout: Dropout,
    pub continuous_norm: BatchNorm1d,
    /// Hidden dense layers, each followed by the batch norm at the same index
    pub hidden: Vec<DenseLayer>,
    pub hidden_norms: Vec<BatchNorm1d>,
    pub output: DenseLayer,
    #[serde(skip, default = "default_rng")]
    rng: StdRng,
}

impl TabularModel {
    /// Build a model for `embedding_sizes` (categories, width) per categorical
    /// column, `n_continuous` continuous columns and `n_classes` outputs.
    pub fn new(
        embedding_sizes: &[(usize, usize)],
        n_continuous: usize,
        n_classes: usize,
        config: &ModelConfig,
        seed: u64,
    ) -> Result<Self> {
        if n_classes < 2 {
            return Err(Error::InvalidInput(format!(
                "need at least two classes, got {}",
                n_classes
            )));
        }
        if let Some(&(n, d)) = embedding_sizes.iter().find(|&&(n, d)| n == 0 || d == 0) {
            return Err(Error::InvalidInput(format!(
                "embedding with {} categories and width {}",
                n, d
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let embeddings: Vec<Embedding> = embedding_sizes
            .iter()
            .map(|&(n, d)| Embedding::new(n, d, &mut rng))
            .collect();
        let n_emb: usize = embedding_sizes.iter().map(|&(_, d)| d).sum();

        let mut hidden = Vec::with_capacity(config.hidden_sizes.len());
        let mut hidden_norms = Vec::with_capacity(config.hidden_sizes.len());
        let mut width = n_emb + n_continuous;
        if width == 0 {
            return Err(Error::InvalidInput("model has no input features".into()));
        }
        for &size in &config.hidden_sizes {
            hidden.push(
                DenseLayer::new(width, size, ActivationType::ReLU, &mut rng)
                    .with_dropout(config.dropout),
            );
            hidden_norms.push(BatchNorm1d::new(size));
            width = size;
        }
        let output = DenseLayer::new(width, n_classes, ActivationType::Linear, &mut rng);

        Ok(Self {
            embeddings,
            embedding_dropout: Dropout::new(config.embedding_dropout),
            continuous_norm: BatchNorm1d::new(n_continuous),
            hidden,
            hidden_norms,
            output,
            rng,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.output.output_size()
    }

    pub fn n_continuous(&self) -> usize {
        self.continuous_norm.num_features()
    }

    /// Width of all embeddings concatenated
    pub fn embedding_width(&self) -> usize {
        self.embeddings.iter().map(Embedding::dim).sum()
    }

    /// Reseed the dropout RNG
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Logits for a batch
    pub fn forward(
        &mut self,
        categorical: ArrayView2<usize>,
        continuous: &Array2<f64>,
        training: bool,
    ) -> Result<Array2<f64>> {
        let batch = categorical.nrows();
        if categorical.ncols() != self.embeddings.len() {
            return Err(Error::shape(
                format!("{} categorical columns", self.embeddings.len()),
                categorical.ncols(),
            ));
        }
        if continuous.nrows() != batch {
            return Err(Error::shape(
                format!("{} continuous rows", batch),
                continuous.nrows(),
            ));
        }

        let mut parts = Vec::with_capacity(self.embeddings.len());
        for (i, emb) in self.embeddings.iter_mut().enumerate() {
            parts.push(emb.forward(categorical.column(i))?);
        }
        let x_emb = if parts.is_empty() {
            Array2::zeros((batch, 0))
        } else {
            let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
            concatenate(Axis(1), &views)?
        };
        let x_emb = self.embedding_dropout.forward(&x_emb, training, &mut self.rng);
        let x_cont = self.continuous_norm.forward(continuous, training)?;

        let mut x = concatenate(Axis(1), &[x_emb.view(), x_cont.view()])?;
        for (layer, norm) in self.hidden.iter_mut().zip(self.hidden_norms.iter_mut()) {
            x = layer.forward(&x, training, &mut self.rng)?;
            x = norm.forward(&x, training)?;
        }
        self.output.forward(&x, training, &mut self.rng)
    }

    /// Backpropagate the logit gradient of the last training forward pass
    pub fn backward(&mut self, grad_logits: &Array2<f64>) -> Result<()> {
        let mut grad = self.output.backward(grad_logits)?;
        for (layer, norm) in self
            .hidden
            .iter_mut()
            .zip(self.hidden_norms.iter_mut())
            .rev()
        {
            grad = norm.backward(&grad)?;
            grad = layer.backward(&grad)?;
        }

        let n_emb = self.embedding_width();
        let grad_cont = grad.slice(s![.., n_emb..]).to_owned();
        self.continuous_norm.backward(&grad_cont)?;

        let grad_emb = self
            .embedding_dropout
            .backward(&grad.slice(s![.., ..n_emb]).to_owned());
        let mut offset = 0;
        for emb in &mut self.embeddings {
            let d = emb.dim();
            emb.backward(&grad_emb.slice(s![.., offset..offset + d]).to_owned())?;
            offset += d;
        }
        Ok(())
    }

    /// Apply the stored gradients with one optimizer step
    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer) {
        optimizer.next_step();
        let mut slot = 0;

        for emb in &mut self.embeddings {
            if let Some(g) = &emb.grad_weights {
                optimizer.update_matrix(slot, &mut emb.weights, g);
            }
            slot += 1;
        }

        let norms = std::iter::once(&mut self.continuous_norm).chain(self.hidden_norms.iter_mut());
        for norm in norms {
            if let Some(g) = &norm.grad_gamma {
                optimizer.update_vector(slot, &mut norm.gamma, g);
            }
            if let Some(g) = &norm.grad_beta {
                optimizer.update_vector(slot + 1, &mut norm.beta, g);
            }
            slot += 2;
        }

        for layer in self.hidden.iter_mut().chain(std::iter::once(&mut self.output)) {
            if let Some(g) = &layer.grad_weights {
                optimizer.update_matrix(slot, &mut layer.weights, g);
            }
            if let Some(g) = &layer.grad_biases {
                optimizer.update_vector(slot + 1, &mut layer.biases, g);
            }
            slot += 2;
        }
    }

    /// Class probabilities in evaluation mode
    pub fn predict_proba(
        &mut self,
        categorical: ArrayView2<usize>,
        continuous: &Array2<f64>,
    ) -> Result<Array2<f64>> {
        let logits = self.forward(categorical, continuous, false)?;
        Ok(softmax(&logits))
    }

    /// Get total number of parameters
    pub fn num_parameters(&self) -> usize {
        self.embeddings.iter().map(Embedding::num_parameters).sum::<usize>()
            + self.continuous_norm.num_parameters()
            + self.hidden.iter().map(DenseLayer::num_parameters).sum::<usize>()
            + self.hidden_norms.iter().map(BatchNorm1d::num_parameters).sum::<usize>()
            + self.output.num_parameters()
    }

    /// Save model to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Load model from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let model: Self = serde_json::from_reader(reader)?;
        if model.hidden.len() != model.hidden_norms.len() {
            return Err(Error::InvalidInput(
                "model file has mismatched hidden layers and norms".into(),
            ));
        }
        Ok(model)
    }

    /// Log the network layout
    pub fn summary(&self) {
        info!("Tabular Model Summary");
        for (i, emb) in self.embeddings.iter().enumerate() {
            info!("  Embedding {}: {} x {}", i + 1, emb.n_categories(), emb.dim());
        }
        info!(
            "  Embedding dropout: {}, continuous inputs: {}",
            self.embedding_dropout.rate,
            self.n_continuous()
        );
        for (i, layer) in self.hidden.iter().enumerate() {
            info!(
                "  Hidden {}: {} -> {} ({:?}, dropout {}), params: {}",
                i + 1,
                layer.input_size(),
                layer.output_size(),
                layer.activation_type,
                layer.dropout.rate,
                layer.num_parameters()
            );
        }
        info!(
            "  Output: {} -> {}, params: {}",
            self.output.input_size(),
            self.output.output_size(),
            self.output.num_parameters()
        );
        info!("  Total parameters: {}", self.num_parameters());
    }
}
