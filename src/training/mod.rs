//! Training module
//!
//! This module provides:
//! - The mini-batch training loop with validation
//! - Per-epoch metrics and history

mod metrics;
mod trainer;

pub use metrics::{accuracy, EpochMetrics, TrainingHistory};
pub use trainer::Trainer;
