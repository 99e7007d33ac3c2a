//! End-to-end run: read, encode, split, train or load, predict, write

use std::path::PathBuf;
use tracing::info;

use crate::data::{
    preprocess, train_test_split, write_submission, EmbeddingPlan, RawTable, TabularDataset,
};
use crate::error::{Error, Result};
use crate::nn::TabularModel;
use crate::training::{EpochMetrics, Trainer, TrainingHistory};
use crate::utils::Config;

/// How the model is obtained
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Train a fresh model
    Train,
    /// Load a previously saved model and skip training
    Load(PathBuf),
}

/// Options of a run that are not part of the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub model_source: ModelSource,
    /// Save the model here after training
    pub save_model: Option<PathBuf>,
    /// Predict the test rows and write the submission
    pub predict: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model_source: ModelSource::Train,
            save_model: None,
            predict: true,
        }
    }
}

/// What a run did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub n_train_rows: usize,
    pub n_validation_rows: usize,
    pub n_test_rows: usize,
    pub class_names: Vec<String>,
    pub plan: EmbeddingPlan,
    pub dropped_columns: Vec<String>,
    pub history: Option<TrainingHistory>,
    pub submission: Option<PathBuf>,
}

pub struct Pipeline {
    config: Config,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(config: Config, options: RunOptions) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, options })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage. `on_epoch` is forwarded to the trainer.
    pub fn run<F>(&self, on_epoch: F) -> Result<RunReport>
    where
        F: FnMut(&EpochMetrics),
    {
        let data_cfg = &self.config.data;
        let model_cfg = &self.config.model;
        let train_cfg = &self.config.training;

        info!("loading {}", data_cfg.train_path.display());
        let train_raw = RawTable::from_csv(&data_cfg.train_path)?;
        info!("loading {}", data_cfg.test_path.display());
        let test_raw = RawTable::from_csv(&data_cfg.test_path)?;

        let prep = preprocess(&train_raw, &test_raw, data_cfg)?;
        let plan = EmbeddingPlan::from_table(
            &prep.train,
            model_cfg.embedding_threshold,
            model_cfg.max_embedding_dim,
        );
        info!(
            "embedding sizes: {:?}, continuous columns: {}",
            plan.sizes(),
            plan.n_continuous()
        );

        let (train_idx, val_idx) = train_test_split(
            prep.train.n_rows(),
            train_cfg.validation_fraction,
            train_cfg.seed,
        )?;
        let pick = |idx: &[usize]| idx.iter().map(|&i| prep.labels[i]).collect::<Vec<_>>();
        let train_ds = TabularDataset::from_table(&prep.train, &train_idx, pick(&train_idx), &plan)?;
        let valid_ds = TabularDataset::from_table(&prep.train, &val_idx, pick(&val_idx), &plan)?;
        info!(
            "split: {} training rows, {} validation rows",
            train_ds.len(),
            valid_ds.len()
        );

        let mut trainer = Trainer::new(train_cfg.clone());
        let n_classes = prep.target_encoder.n_classes();

        let (mut model, history) = match &self.options.model_source {
            ModelSource::Train => {
                let mut model = TabularModel::new(
                    &plan.sizes(),
                    plan.n_continuous(),
                    n_classes,
                    model_cfg,
                    train_cfg.seed,
                )?;
                model.summary();
                let history = trainer.fit(&mut model, &train_ds, &valid_ds, on_epoch)?;
                if let Some(path) = &self.options.save_model {
                    model.save(path)?;
                    info!("saved model to {}", path.display());
                }
                (model, Some(history))
            }
            ModelSource::Load(path) => {
                let mut model = TabularModel::load(path)?;
                info!("loaded model from {}", path.display());
                check_compatible(&model, &plan, n_classes)?;
                trainer.validate(&mut model, &valid_ds)?;
                (model, None)
            }
        };

        let submission = if self.options.predict {
            let test_ds = TabularDataset::unlabeled(&prep.test, &plan)?;
            let probs = trainer.predict(&mut model, &test_ds)?;
            info!("predicted {} test rows", probs.nrows());
            write_submission(
                &data_cfg.sample_submission_path,
                &data_cfg.output_path,
                &data_cfg.id_column,
                &prep.test_ids,
                prep.class_names(),
                &probs,
            )?;
            Some(data_cfg.output_path.clone())
        } else {
            None
        };

        Ok(RunReport {
            n_train_rows: train_ds.len(),
            n_validation_rows: valid_ds.len(),
            n_test_rows: prep.test.n_rows(),
            class_names: prep.class_names().to_vec(),
            dropped_columns: prep.dropped_sparse.iter().map(|(n, _)| n.clone()).collect(),
            plan,
            history,
            submission,
        })
    }
}

/// A loaded model must match the data it is applied to
fn check_compatible(model: &TabularModel, plan: &EmbeddingPlan, n_classes: usize) -> Result<()> {
    let model_sizes: Vec<(usize, usize)> = model
        .embeddings
        .iter()
        .map(|e| (e.n_categories(), e.dim()))
        .collect();
    if model_sizes != plan.sizes() {
        return Err(Error::shape(
            format!("embeddings {:?}", plan.sizes()),
            format!("embeddings {:?}", model_sizes),
        ));
    }
    if model.n_continuous() != plan.n_continuous() {
        return Err(Error::shape(
            format!("{} continuous inputs", plan.n_continuous()),
            model.n_continuous(),
        ));
    }
    if model.n_classes() != n_classes {
        return Err(Error::shape(format!("{} classes", n_classes), model.n_classes()));
    }
    Ok(())
}
