//! Configuration management
//!
//! All knobs of a run live in one TOML file. Every field has a default, so a
//! partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Input/output locations and column handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub sample_submission_path: PathBuf,
    pub output_path: PathBuf,
    /// Column holding the outcome label in the training file
    pub target_column: String,
    /// Row identifier of the test file, also the key column of the submission
    pub id_column: String,
    /// Columns present only in the training file
    pub train_only_columns: Vec<String>,
    /// Columns dropped from both files before encoding
    pub drop_columns: Vec<String>,
    /// Columns with more missing cells than this (over train + test) are dropped
    pub null_threshold: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("train.csv"),
            test_path: PathBuf::from("test.csv"),
            sample_submission_path: PathBuf::from("sample_submission.csv"),
            output_path: PathBuf::from("samp.csv"),
            target_column: "OutcomeType".to_string(),
            id_column: "ID".to_string(),
            train_only_columns: vec![
                "OutcomeType".to_string(),
                "OutcomeSubtype".to_string(),
                "AnimalID".to_string(),
            ],
            drop_columns: vec!["DateTime".to_string()],
            null_threshold: 10_000,
        }
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden_sizes: Vec<usize>,
    pub embedding_dropout: f64,
    pub dropout: f64,
    /// Columns with more categories than this get an embedding
    pub embedding_threshold: usize,
    pub max_embedding_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![200, 70],
            embedding_dropout: 0.6,
            dropout: 0.3,
            embedding_threshold: 2,
            max_embedding_dim: 50,
        }
    }
}

/// Optimizer choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub optimizer: OptimizerKind,
    /// Only used by SGD
    pub momentum: f64,
    pub validation_fraction: f64,
    pub seed: u64,
    pub shuffle: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 8,
            batch_size: 1000,
            learning_rate: 0.05,
            weight_decay: 0.00001,
            optimizer: OptimizerKind::Adam,
            momentum: 0.0,
            validation_fraction: 0.10,
            seed: 0,
            shuffle: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        if !(t.validation_fraction > 0.0 && t.validation_fraction < 1.0) {
            return Err(Error::Config(format!(
                "validation_fraction must be in (0, 1), got {}",
                t.validation_fraction
            )));
        }
        if t.learning_rate <= 0.0 {
            return Err(Error::Config("learning_rate must be positive".into()));
        }
        if t.weight_decay < 0.0 {
            return Err(Error::Config("weight_decay must be non-negative".into()));
        }

        let m = &self.model;
        for (name, p) in [("dropout", m.dropout), ("embedding_dropout", m.embedding_dropout)] {
            if !(0.0..1.0).contains(&p) {
                return Err(Error::Config(format!("{name} must be in [0, 1), got {p}")));
            }
        }
        if m.max_embedding_dim == 0 {
            return Err(Error::Config("max_embedding_dim must be positive".into()));
        }
        if m.hidden_sizes.iter().any(|&h| h == 0) {
            return Err(Error::Config("hidden sizes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data.target_column, "OutcomeType");
        assert_eq!(config.model.hidden_sizes, vec![200, 70]);
        assert_eq!(config.training.epochs, 8);
        assert_eq!(config.training.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [training]
            epochs = 3
            optimizer = "sgd"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.training.epochs, 3);
        assert_eq!(parsed.training.optimizer, OptimizerKind::Sgd);
        assert_eq!(parsed.training.batch_size, 1000);
        assert_eq!(parsed.data.null_threshold, 10_000);
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");

        let mut config = Config::default();
        config.training.seed = 42;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.training.seed, 42);
        assert_eq!(loaded.data.drop_columns, vec!["DateTime".to_string()]);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut config = Config::default();
        config.training.validation_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();

        let malformed = dir.path().join("malformed.toml");
        std::fs::write(&malformed, "[training\nepochs = 3\n").unwrap();
        assert!(matches!(Config::load(&malformed), Err(Error::ConfigParse(_))));

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[training]\nbatch_size = 0\n").unwrap();
        assert!(matches!(Config::load(&invalid), Err(Error::Config(_))));

        assert!(matches!(
            Config::load(dir.path().join("absent.toml")),
            Err(Error::Io(_))
        ));
    }
}
