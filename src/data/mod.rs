//! Data Module
//!
//! Turns the raw CSV files into model-ready arrays and back:
//! - CSV tables with missing-cell tracking
//! - Label encoding and column cleaning
//! - Train/validation split and batched loading
//! - Submission file writing

mod dataset;
mod encoder;
mod preprocess;
mod split;
mod submission;
mod table;

pub use dataset::{Batch, DataLoader, EmbeddingPlan, EmbeddingSpec, TabularDataset};
pub use encoder::{ColumnKind, LabelEncoder};
pub use preprocess::{preprocess, value_counts, EncodedColumn, EncodedTable, Preprocessed};
pub use split::train_test_split;
pub use submission::{fill_submission, write_submission};
pub use table::RawTable;
