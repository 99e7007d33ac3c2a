//! # Shelter Outcome Network
//!
//! Predicts shelter animal outcomes from tabular data with a feed-forward
//! network that learns an embedding for every high-cardinality categorical
//! column.
//!
//! ## Modules
//!
//! - `data` - CSV tables, label encoding, splitting, batching, submission output
//! - `nn` - Embeddings, dense layers, batch norm, loss and optimizers
//! - `training` - Mini-batch training loop and metrics
//! - `pipeline` - The end-to-end run
//! - `utils` - Configuration and logging

pub mod data;
pub mod error;
pub mod nn;
pub mod pipeline;
pub mod training;
pub mod utils;

pub use error::{Error, Result};
pub use nn::TabularModel;
pub use pipeline::{ModelSource, Pipeline, RunOptions, RunReport};
pub use training::Trainer;
pub use utils::Config;
