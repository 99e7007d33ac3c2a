//! Tabular dataset and batched loading
//!
//! Encoded columns are split into two blocks: categorical codes that feed
//! the embedding layers and continuous values that go through batch norm.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::preprocess::EncodedTable;
use crate::error::{Error, Result};

/// Embedding shape for one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSpec {
    pub column: String,
    pub n_categories: usize,
    pub dim: usize,
}

/// Which columns are embedded and which are fed as continuous values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingPlan {
    pub embedded: Vec<EmbeddingSpec>,
    pub continuous: Vec<String>,
}

impl EmbeddingPlan {
    /// Embed every column with more than `threshold` categories.
    ///
    /// Embedding width is `min(max_dim, (n_categories + 1) / 2)`.
    pub fn from_table(table: &EncodedTable, threshold: usize, max_dim: usize) -> Self {
        let mut embedded = Vec::new();
        let mut continuous = Vec::new();
        for col in table.columns() {
            if col.cardinality > threshold {
                embedded.push(EmbeddingSpec {
                    column: col.name.clone(),
                    n_categories: col.cardinality,
                    dim: max_dim.min((col.cardinality + 1) / 2),
                });
            } else {
                continuous.push(col.name.clone());
            }
        }
        Self {
            embedded,
            continuous,
        }
    }

    /// `(n_categories, dim)` per embedded column
    pub fn sizes(&self) -> Vec<(usize, usize)> {
        self.embedded.iter().map(|e| (e.n_categories, e.dim)).collect()
    }

    pub fn n_continuous(&self) -> usize {
        self.continuous.len()
    }

    /// Width of all embeddings concatenated
    pub fn embedding_width(&self) -> usize {
        self.embedded.iter().map(|e| e.dim).sum()
    }
}

/// Rows ready for the model
#[derive(Debug, Clone)]
pub struct TabularDataset {
    /// Category codes, one column per embedded feature
    pub categorical: Array2<usize>,
    /// Continuous inputs, one column per non-embedded feature
    pub continuous: Array2<f64>,
    /// Class index per row
    pub labels: Vec<usize>,
}

impl TabularDataset {
    /// Select `rows` of `table` and arrange them according to `plan`
    pub fn from_table(
        table: &EncodedTable,
        rows: &[usize],
        labels: Vec<usize>,
        plan: &EmbeddingPlan,
    ) -> Result<Self> {
        if labels.len() != rows.len() {
            return Err(Error::shape(
                format!("{} labels", rows.len()),
                format!("{} labels", labels.len()),
            ));
        }
        if let Some(&bad) = rows.iter().find(|&&r| r >= table.n_rows()) {
            return Err(Error::InvalidInput(format!(
                "row {} out of bounds for {} rows",
                bad,
                table.n_rows()
            )));
        }

        let lookup = |name: &str| {
            table
                .column(name)
                .ok_or_else(|| Error::MissingColumn(name.to_string()))
        };

        let mut categorical = Array2::zeros((rows.len(), plan.embedded.len()));
        for (j, spec) in plan.embedded.iter().enumerate() {
            let col = lookup(&spec.column)?;
            for (i, &r) in rows.iter().enumerate() {
                categorical[[i, j]] = col.codes[r];
            }
        }

        let mut continuous = Array2::zeros((rows.len(), plan.continuous.len()));
        for (j, name) in plan.continuous.iter().enumerate() {
            let col = lookup(name)?;
            for (i, &r) in rows.iter().enumerate() {
                continuous[[i, j]] = col.codes[r] as f64;
            }
        }

        Ok(Self {
            categorical,
            continuous,
            labels,
        })
    }

    /// Every row of `table`, with zero placeholder labels
    pub fn unlabeled(table: &EncodedTable, plan: &EmbeddingPlan) -> Result<Self> {
        let rows: Vec<usize> = (0..table.n_rows()).collect();
        let labels = vec![0; rows.len()];
        Self::from_table(table, &rows, labels, plan)
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Gather a batch of rows
    pub fn get_batch(&self, indices: &[usize]) -> Batch {
        Batch {
            categorical: self.categorical.select(Axis(0), indices),
            continuous: self.continuous.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// One mini-batch
#[derive(Debug, Clone)]
pub struct Batch {
    pub categorical: Array2<usize>,
    pub continuous: Array2<f64>,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Data loader for batched iteration
pub struct DataLoader {
    indices: Vec<usize>,
    batch_size: usize,
    current_pos: usize,
    shuffle: bool,
    rng: StdRng,
}

impl DataLoader {
    /// Create a new data loader
    pub fn new(dataset_size: usize, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        let mut loader = Self {
            indices: (0..dataset_size).collect(),
            batch_size: batch_size.max(1),
            current_pos: 0,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
        };
        if shuffle {
            loader.indices.shuffle(&mut loader.rng);
        }
        loader
    }

    /// Get number of batches
    pub fn num_batches(&self) -> usize {
        (self.indices.len() + self.batch_size - 1) / self.batch_size
    }

    /// Reset the loader for a new epoch
    pub fn reset(&mut self) {
        self.current_pos = 0;
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }

    /// Get next batch of indices
    pub fn next_batch(&mut self) -> Option<Vec<usize>> {
        if self.current_pos >= self.indices.len() {
            return None;
        }

        let end = (self.current_pos + self.batch_size).min(self.indices.len());
        let batch = self.indices[self.current_pos..end].to_vec();
        self.current_pos = end;

        Some(batch)
    }
}

impl Iterator for DataLoader {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}
