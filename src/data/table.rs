//! Raw CSV tables
//!
//! A thin row-major container for string cells. Empty cells and the usual
//! missing-value markers (`NA`, `NaN`, `null`, ...) are kept as `None` so the
//! preprocessing step can count and fill them.

use csv::{Reader, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Cell contents read as missing, as pandas' `read_csv` does by default
const NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || NA_VALUES.contains(&trimmed)
}

/// Headed table of optional string cells
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build a table from headers and rows; every row must match the header width
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != headers.len()) {
            return Err(Error::shape(
                format!("{} cells per row", headers.len()),
                format!("{} cells", bad.len()),
            ));
        }
        Ok(Self { headers, rows })
    }

    /// Load a headed CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a headed CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = Reader::from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row = record
                .iter()
                .map(|cell| (!is_missing(cell)).then(|| cell.to_string()))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Write the table as a headed CSV file
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_writer(file)
    }

    /// Write the table as CSV into any writer
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    /// Replace the cells of an existing column
    pub fn set_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        let idx = self.column_index(name)?;
        if values.len() != self.rows.len() {
            return Err(Error::shape(self.rows.len(), values.len()));
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// Remove the named columns. Every name must exist.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut indices = names
            .iter()
            .map(|n| self.column_index(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();

        for &idx in indices.iter().rev() {
            self.headers.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    /// Number of missing cells in a column
    pub fn null_count(&self, name: &str) -> Result<usize> {
        Ok(self.column(name)?.iter().filter(|c| c.is_none()).count())
    }

    /// Append the rows of `bottom` under `top`. Headers must match exactly.
    pub fn vstack(mut top: RawTable, bottom: RawTable) -> Result<Self> {
        if top.headers != bottom.headers {
            return Err(Error::SchemaMismatch(format!(
                "cannot stack {:?} onto {:?}",
                bottom.headers, top.headers
            )));
        }
        top.rows.extend(bottom.rows);
        Ok(top)
    }
}
