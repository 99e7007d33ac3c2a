//! Neural Network Module
//!
//! Provides building blocks for the tabular classifier:
//! - Categorical embedding tables
//! - Dense layers with dropout, batch normalization
//! - Cross-entropy loss and optimizers (Adam, SGD)
//! - The full embedding model with save/load

pub mod activation;
mod batch_norm;
mod dropout;
mod embedding;
mod layer;
pub mod loss;
mod model;
pub mod optimizer;

pub use activation::{argmax_rows, softmax, ActivationType};
pub use batch_norm::BatchNorm1d;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use layer::DenseLayer;
pub use loss::cross_entropy;
pub use model::TabularModel;
pub use optimizer::{build_optimizer, Adam, Optimizer, SGD};
