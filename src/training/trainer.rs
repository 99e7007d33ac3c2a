//! Mini-batch training loop
//!
//! One epoch runs every training batch through forward, cross-entropy,
//! backward and an optimizer step; validation follows in evaluation mode.

use ndarray::{concatenate, Array2, Axis};
use tracing::info;

use super::metrics::{accuracy, EpochMetrics, TrainingHistory};
use crate::data::{DataLoader, TabularDataset};
use crate::error::{Error, Result};
use crate::nn::{argmax_rows, build_optimizer, cross_entropy, Optimizer, TabularModel};
use crate::utils::TrainingConfig;

/// Trainer for tabular models
pub struct Trainer {
    config: TrainingConfig,
    optimizer: Box<dyn Optimizer>,
}

impl Trainer {
    /// Create a new trainer with the optimizer named in `config`
    pub fn new(config: TrainingConfig) -> Self {
        let optimizer = build_optimizer(&config);
        Self { config, optimizer }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// One pass over `data`; returns the batch-size weighted mean loss
    pub fn train_epoch(
        &mut self,
        model: &mut TabularModel,
        data: &TabularDataset,
        loader: &mut DataLoader,
    ) -> Result<f64> {
        let mut total = 0usize;
        let mut sum_loss = 0.0;

        loader.reset();
        for indices in loader.by_ref() {
            let batch = data.get_batch(&indices);
            let logits = model.forward(batch.categorical.view(), &batch.continuous, true)?;
            let (loss, grad) = cross_entropy(&logits, &batch.labels)?;
            model.backward(&grad)?;
            model.apply_gradients(self.optimizer.as_mut());

            total += batch.len();
            sum_loss += batch.len() as f64 * loss;
        }

        if total == 0 {
            return Err(Error::InvalidInput("training set is empty".into()));
        }
        Ok(sum_loss / total as f64)
    }

    /// Validation loss and accuracy in evaluation mode
    pub fn validate(&self, model: &mut TabularModel, data: &TabularDataset) -> Result<(f64, f64)> {
        let mut total = 0usize;
        let mut sum_loss = 0.0;
        let mut predictions = Vec::with_capacity(data.len());
        let mut labels = Vec::with_capacity(data.len());

        let loader = DataLoader::new(data.len(), self.config.batch_size, false, self.config.seed);
        for indices in loader {
            let batch = data.get_batch(&indices);
            let logits = model.forward(batch.categorical.view(), &batch.continuous, false)?;
            let (loss, _) = cross_entropy(&logits, &batch.labels)?;

            total += batch.len();
            sum_loss += batch.len() as f64 * loss;
            predictions.extend(argmax_rows(&logits));
            labels.extend(batch.labels);
        }

        if total == 0 {
            return Err(Error::InvalidInput("validation set is empty".into()));
        }
        let val_loss = sum_loss / total as f64;
        let val_accuracy = accuracy(&predictions, &labels);
        info!("valid loss {:.3} and accuracy {:.3}", val_loss, val_accuracy);
        Ok((val_loss, val_accuracy))
    }

    /// Train for the configured number of epochs.
    ///
    /// `on_epoch` is called after every epoch, e.g. to drive a progress bar.
    pub fn fit<F>(
        &mut self,
        model: &mut TabularModel,
        train: &TabularDataset,
        valid: &TabularDataset,
        mut on_epoch: F,
    ) -> Result<TrainingHistory>
    where
        F: FnMut(&EpochMetrics),
    {
        self.optimizer.reset();
        model.reseed(self.config.seed);
        let mut loader = DataLoader::new(
            train.len(),
            self.config.batch_size,
            self.config.shuffle,
            self.config.seed,
        );
        let mut history = TrainingHistory::default();

        for epoch in 1..=self.config.epochs {
            let train_loss = self.train_epoch(model, train, &mut loader)?;
            info!("epoch {}/{} training loss: {:.6}", epoch, self.config.epochs, train_loss);
            let (val_loss, val_accuracy) = self.validate(model, valid)?;

            let metrics = EpochMetrics {
                epoch,
                train_loss,
                val_loss,
                val_accuracy,
            };
            on_epoch(&metrics);
            history.push(metrics);
        }

        Ok(history)
    }

    /// Class probabilities for every row of `data`, in row order
    pub fn predict(&self, model: &mut TabularModel, data: &TabularDataset) -> Result<Array2<f64>> {
        let loader = DataLoader::new(data.len(), self.config.batch_size, false, self.config.seed);
        let mut parts = Vec::with_capacity(loader.num_batches());
        for indices in loader {
            let batch = data.get_batch(&indices);
            parts.push(model.predict_proba(batch.categorical.view(), &batch.continuous)?);
        }

        if parts.is_empty() {
            return Ok(Array2::zeros((0, model.n_classes())));
        }
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }
}
