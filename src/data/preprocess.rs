//! Stacking, cleaning and encoding of the train and test tables
//!
//! Train and test features are encoded together so both sides share one
//! code book per column. The target is encoded separately.

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::encoder::{ColumnKind, LabelEncoder};
use super::table::RawTable;
use crate::error::{Error, Result};
use crate::utils::DataConfig;

/// One label-encoded feature column
#[derive(Debug, Clone)]
pub struct EncodedColumn {
    pub name: String,
    pub codes: Vec<usize>,
    pub cardinality: usize,
}

/// Label-encoded feature columns sharing a row count
#[derive(Debug, Clone)]
pub struct EncodedTable {
    columns: Vec<EncodedColumn>,
    n_rows: usize,
}

impl EncodedTable {
    pub fn new(columns: Vec<EncodedColumn>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.codes.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.codes.len() != n_rows) {
            return Err(Error::shape(
                format!("{} rows", n_rows),
                format!("{} rows in column '{}'", bad.codes.len(), bad.name),
            ));
        }
        Ok(Self { columns, n_rows })
    }

    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&EncodedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Rows `range` of every column, keeping cardinalities
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> Result<Self> {
        if range.end > self.n_rows || range.start > range.end {
            return Err(Error::InvalidInput(format!(
                "row range {:?} out of bounds for {} rows",
                range, self.n_rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| EncodedColumn {
                name: c.name.clone(),
                codes: c.codes[range.clone()].to_vec(),
                cardinality: c.cardinality,
            })
            .collect();
        Ok(Self {
            columns,
            n_rows: range.len(),
        })
    }
}

/// Output of preprocessing
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Encoded training features
    pub train: EncodedTable,
    /// Encoded test features, same columns as `train`
    pub test: EncodedTable,
    /// Encoded target, one per training row
    pub labels: Vec<usize>,
    /// Encoder of the target; its classes give the output column order
    pub target_encoder: LabelEncoder,
    /// Test row ids, in file order
    pub test_ids: Vec<String>,
    /// Columns removed for having too many missing cells
    pub dropped_sparse: Vec<(String, usize)>,
}

impl Preprocessed {
    pub fn class_names(&self) -> &[String] {
        self.target_encoder.classes()
    }
}

/// Count occurrences of each value, sorted by value
pub fn value_counts<T: Ord + Clone>(values: &[T]) -> BTreeMap<T, usize> {
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(v.clone()).or_insert(0) += 1;
    }
    counts
}

/// Clean and encode the train and test tables
pub fn preprocess(train: &RawTable, test: &RawTable, config: &DataConfig) -> Result<Preprocessed> {
    let n_train = train.n_rows();
    let n_test = test.n_rows();

    // Target
    let target_cells = train.column(&config.target_column)?;
    let targets = target_cells
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.map(str::to_string).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "missing '{}' in training row {}",
                    config.target_column, row
                ))
            })
        })
        .collect::<Result<Vec<String>>>()?;

    let test_ids: Vec<String> = test
        .column(&config.id_column)?
        .into_iter()
        .map(|c| c.unwrap_or_default().to_string())
        .collect();

    let mut train_x = train.clone();
    train_x.drop_columns(&config.train_only_columns)?;
    let mut test_x = test.clone();
    test_x.drop_columns(&[config.id_column.as_str()])?;

    let mut stacked = RawTable::vstack(train_x, test_x)?;
    let always: Vec<&str> = config
        .drop_columns
        .iter()
        .map(String::as_str)
        .filter(|c| stacked.headers().iter().any(|h| h == c))
        .collect();
    stacked.drop_columns(&always)?;

    // Sparse columns
    let mut dropped_sparse = Vec::new();
    for name in stacked.headers().to_vec() {
        let nulls = stacked.null_count(&name)?;
        if nulls > config.null_threshold {
            info!("dropping {} {}", name, nulls);
            dropped_sparse.push((name, nulls));
        }
    }
    let sparse_names: Vec<&str> = dropped_sparse.iter().map(|(n, _)| n.as_str()).collect();
    stacked.drop_columns(&sparse_names)?;

    // Fill and encode
    let mut columns = Vec::with_capacity(stacked.n_cols());
    for name in stacked.headers() {
        let cells = stacked.column(name)?;
        let kind = ColumnKind::infer(cells.iter().copied());
        let filled: Vec<&str> = cells
            .iter()
            .map(|&c| c.unwrap_or(kind.fill_value()))
            .collect();
        let (encoder, codes) = LabelEncoder::fit_transform(name.as_str(), kind, &filled)?;
        debug!("encoded {} ({:?}) into {} classes", name, kind, encoder.n_classes());
        columns.push(EncodedColumn {
            name: name.clone(),
            codes,
            cardinality: encoder.n_classes(),
        });
    }
    let encoded = EncodedTable::new(columns)?;

    let train_enc = encoded.slice_rows(0..n_train)?;
    let test_enc = encoded.slice_rows(n_train..n_train + n_test)?;
    if train_enc.n_rows() != n_train || test_enc.n_rows() != n_test {
        return Err(Error::shape(
            format!("{} train / {} test rows", n_train, n_test),
            format!("{} / {}", train_enc.n_rows(), test_enc.n_rows()),
        ));
    }
    info!(
        "train shape: ({}, {}) original: ({}, {})",
        train_enc.n_rows(),
        train_enc.n_cols(),
        train.n_rows(),
        train.n_cols()
    );
    info!(
        "test shape: ({}, {}) original: ({}, {})",
        test_enc.n_rows(),
        test_enc.n_cols(),
        test.n_rows(),
        test.n_cols()
    );

    let (target_encoder, labels) =
        LabelEncoder::fit_transform(config.target_column.as_str(), ColumnKind::Text, &targets)?;
    info!("target counts: {:?}", value_counts(&targets));
    info!("encoded target counts: {:?}", value_counts(&labels));

    Ok(Preprocessed {
        train: train_enc,
        test: test_enc,
        labels,
        target_encoder,
        test_ids,
        dropped_sparse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(null_threshold: usize) -> DataConfig {
        DataConfig {
            null_threshold,
            ..DataConfig::default()
        }
    }

    fn tables() -> (RawTable, RawTable) {
        let train = "AnimalID,Name,DateTime,OutcomeType,OutcomeSubtype,AnimalType,Age\n\
                     A1,Rex,2014-01-01,Adoption,,Dog,2\n\
                     A2,,2014-01-02,Transfer,Partner,Cat,\n\
                     A3,,2014-01-03,Died,,Cat,1\n";
        let test = "ID,Name,DateTime,AnimalType,Age\n\
                    1,,2015-01-01,Dog,3\n\
                    2,Tom,2015-01-02,Cat,1\n";
        (
            RawTable::from_reader(train.as_bytes()).unwrap(),
            RawTable::from_reader(test.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_row_counts_preserved() {
        let (train, test) = tables();
        let out = preprocess(&train, &test, &config(10_000)).unwrap();

        assert_eq!(out.train.n_rows(), 3);
        assert_eq!(out.test.n_rows(), 2);
        assert_eq!(out.labels.len(), 3);
        assert_eq!(out.test_ids, vec!["1", "2"]);
        let names: Vec<_> = out.train.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "AnimalType", "Age"]);
    }

    #[test]
    fn test_sparse_columns_dropped() {
        let (train, test) = tables();
        // Name has 3 missing cells, Age has 1
        let out = preprocess(&train, &test, &config(2)).unwrap();
        assert_eq!(out.dropped_sparse, vec![("Name".to_string(), 3)]);
        assert!(out.train.column("Name").is_none());
        assert!(out.train.column("Age").is_some());
    }

    #[test]
    fn test_fill_rules() {
        let (train, test) = tables();
        let out = preprocess(&train, &test, &config(10_000)).unwrap();

        // Name: NA, Rex, Tom
        let name = out.train.column("Name").unwrap();
        assert_eq!(name.cardinality, 3);
        assert_eq!(name.codes, vec![1, 0, 0]);

        // Age is numeric; missing becomes 0 -> classes 0, 1, 2, 3
        let age = out.train.column("Age").unwrap();
        assert_eq!(age.cardinality, 4);
        assert_eq!(age.codes, vec![2, 0, 1]);
        assert_eq!(out.test.column("Age").unwrap().codes, vec![3, 1]);
    }

    #[test]
    fn test_na_tokens_filled_in_numeric_column() {
        let train = "AnimalID,OutcomeType,OutcomeSubtype,Age\n\
                     A1,Adoption,,1\n\
                     A2,Died,,NA\n\
                     A3,Transfer,,2\n";
        let test = "ID,Age\n1,NaN\n";
        let train = RawTable::from_reader(train.as_bytes()).unwrap();
        let test = RawTable::from_reader(test.as_bytes()).unwrap();
        let out = preprocess(&train, &test, &config(10_000)).unwrap();

        // NA and NaN both become 0 -> classes 0, 1, 2
        let age = out.train.column("Age").unwrap();
        assert_eq!(age.cardinality, 3);
        assert_eq!(age.codes, vec![1, 0, 2]);
        assert_eq!(out.test.column("Age").unwrap().codes, vec![0]);
    }

    #[test]
    fn test_target_encoding() {
        let (train, test) = tables();
        let out = preprocess(&train, &test, &config(10_000)).unwrap();
        assert_eq!(out.class_names(), &["Adoption", "Died", "Transfer"]);
        assert_eq!(out.labels, vec![0, 2, 1]);
    }

    #[test]
    fn test_missing_target_is_error() {
        let train = "AnimalID,OutcomeType,OutcomeSubtype,AnimalType\nA1,,,Dog\n";
        let test = "ID,AnimalType\n1,Cat\n";
        let train = RawTable::from_reader(train.as_bytes()).unwrap();
        let test = RawTable::from_reader(test.as_bytes()).unwrap();
        assert!(preprocess(&train, &test, &config(10_000)).is_err());
    }

    #[test]
    fn test_value_counts() {
        let counts = value_counts(&[3, 1, 3, 0]);
        assert_eq!(counts.get(&3), Some(&2));
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
    }
}
