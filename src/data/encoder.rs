//! Label encoding of categorical columns
//!
//! Classes are the sorted distinct values of the fitted column, so the
//! integer assigned to a value does not depend on row order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// How the values of a column are ordered when encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Every present cell parses as a number
    Numeric,
    /// Anything else
    Text,
}

impl ColumnKind {
    /// Infer the kind from the present cells. A column with no values is text.
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut seen = false;
        for value in values.into_iter().flatten() {
            seen = true;
            if value.trim().parse::<f64>().is_err() {
                return ColumnKind::Text;
            }
        }
        if seen {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    /// Placeholder written into missing cells before encoding
    pub fn fill_value(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "0",
            ColumnKind::Text => "NA",
        }
    }
}

/// Maps each distinct value to its index among the sorted classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    name: String,
    kind: ColumnKind,
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Fit on a column of values
    pub fn fit<S: AsRef<str>>(name: impl Into<String>, kind: ColumnKind, values: &[S]) -> Self {
        let mut classes: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        match kind {
            ColumnKind::Numeric => {
                classes.sort_by(|a, b| {
                    let x = a.trim().parse::<f64>().unwrap_or(f64::NAN);
                    let y = b.trim().parse::<f64>().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b))
                });
                // "1" and "1.0" are the same number
                classes.dedup_by(|a, b| {
                    a.trim().parse::<f64>().ok() == b.trim().parse::<f64>().ok()
                });
            }
            ColumnKind::Text => {
                classes.sort();
                classes.dedup();
            }
        }

        let mut encoder = Self {
            name: name.into(),
            kind,
            classes,
            index: HashMap::new(),
        };
        encoder.rebuild_index();
        encoder
    }

    /// Fit and encode the same values
    pub fn fit_transform<S: AsRef<str>>(
        name: impl Into<String>,
        kind: ColumnKind,
        values: &[S],
    ) -> Result<(Self, Vec<usize>)> {
        let encoder = Self::fit(name, kind, values);
        let codes = encoder.transform(values)?;
        Ok((encoder, codes))
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (self.key(c), i))
            .collect();
    }

    fn key(&self, value: &str) -> String {
        match self.kind {
            ColumnKind::Numeric => match value.trim().parse::<f64>() {
                Ok(v) if v == 0.0 => "0".to_string(),
                Ok(v) => v.to_string(),
                Err(_) => value.to_string(),
            },
            ColumnKind::Text => value.to_string(),
        }
    }

    /// Encode one value
    pub fn encode(&self, value: &str) -> Result<usize> {
        if self.index.is_empty() && !self.classes.is_empty() {
            // deserialized encoder: index was skipped
            return self
                .classes
                .iter()
                .position(|c| self.key(c) == self.key(value))
                .ok_or_else(|| self.unseen(value));
        }
        self.index
            .get(&self.key(value))
            .copied()
            .ok_or_else(|| self.unseen(value))
    }

    fn unseen(&self, value: &str) -> Error {
        Error::UnseenCategory {
            column: self.name.clone(),
            value: value.to_string(),
        }
    }

    /// Encode a column of values
    pub fn transform<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<usize>> {
        values.iter().map(|v| self.encode(v.as_ref())).collect()
    }

    /// Map codes back to class values
    pub fn inverse_transform(&self, codes: &[usize]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&c| {
                self.classes.get(c).cloned().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "code {} out of range for column '{}' with {} classes",
                        c,
                        self.name,
                        self.classes.len()
                    ))
                })
            })
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_classes_are_sorted() {
        let values = ["Transfer", "Adoption", "Died", "Adoption", "Euthanasia", "Return_to_owner"];
        let (encoder, codes) = LabelEncoder::fit_transform("OutcomeType", ColumnKind::Text, &values).unwrap();

        assert_eq!(
            encoder.classes(),
            &["Adoption", "Died", "Euthanasia", "Return_to_owner", "Transfer"]
        );
        assert_eq!(codes, vec![4, 0, 1, 0, 2, 3]);
        assert_eq!(codes.len(), values.len());
    }

    #[test]
    fn test_numeric_classes_sort_by_value() {
        let values = ["10", "2", "0", "2.0", "1"];
        let (encoder, codes) = LabelEncoder::fit_transform("n", ColumnKind::Numeric, &values).unwrap();
        assert_eq!(encoder.n_classes(), 4);
        assert_eq!(codes, vec![3, 2, 0, 2, 1]);
    }

    #[test]
    fn test_unseen_value_is_error() {
        let encoder = LabelEncoder::fit("Color", ColumnKind::Text, &["Black", "White"]);
        assert!(matches!(
            encoder.encode("Tabby"),
            Err(Error::UnseenCategory { .. })
        ));
    }

    #[test]
    fn test_inverse_transform() {
        let encoder = LabelEncoder::fit("Sex", ColumnKind::Text, &["Male", "Female", "Unknown"]);
        let back = encoder.inverse_transform(&[0, 2]).unwrap();
        assert_eq!(back, vec!["Female".to_string(), "Unknown".to_string()]);
        assert!(encoder.inverse_transform(&[3]).is_err());
    }

    #[test]
    fn test_kind_inference() {
        assert_eq!(ColumnKind::infer([Some("1"), None, Some("2.5")]), ColumnKind::Numeric);
        assert_eq!(ColumnKind::infer([Some("1"), Some("cat")]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer([None, None]), ColumnKind::Text);
    }

    #[test]
    fn test_encoder_survives_serde() {
        let encoder = LabelEncoder::fit("Breed", ColumnKind::Text, &["Pug", "Beagle"]);
        let json = serde_json::to_string(&encoder).unwrap();
        let restored: LabelEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.encode("Pug").unwrap(), 1);
    }
}
