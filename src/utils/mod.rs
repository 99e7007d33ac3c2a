//! Utility module
//!
//! This module provides:
//! - Configuration management
//! - Logging setup

mod config;
mod logging;

pub use config::{Config, DataConfig, LoggingConfig, ModelConfig, OptimizerKind, TrainingConfig};
pub use logging::setup_logging;
