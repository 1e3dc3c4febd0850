//! The in-memory tabular dataset passed between every stage of the pipeline.
//!
//! A [`Dataset`] declares its columns once; every row holds exactly one cell
//! per declared column, in declaration order. This keeps column consistency
//! a structural property instead of something each consumer re-checks.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::scalar::Scalar;

/// Errors raised when rows do not fit the dataset's declared columns.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("row has columns {found:?}, dataset declares {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("row has {found} cells, dataset declares {expected} columns")]
    WidthMismatch { expected: usize, found: usize },

    #[error("column `{0}` is declared twice")]
    DuplicateColumn(String),
}

/// An ordered collection of rows over a fixed set of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl Dataset {
    /// Creates an empty dataset with the given columns.
    pub fn with_columns<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if declared.contains(&column) {
                return Err(SchemaError::DuplicateColumn(column));
            }
            declared.push(column);
        }
        Ok(Self {
            columns: declared,
            rows: Vec::new(),
        })
    }

    /// Builds a dataset from a list of JSON objects.
    ///
    /// Columns are the union of all keys in first-seen order; a record that
    /// lacks a key gets [`Scalar::Missing`] in that column.
    pub fn from_json_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: IndexMap<&str, ()> = IndexMap::new();
        for record in records {
            for key in record.keys() {
                columns.entry(key.as_str()).or_insert(());
            }
        }
        let columns: Vec<String> = columns.keys().map(|k| k.to_string()).collect();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map_or(Scalar::Missing, Scalar::from_json))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterates over rows as cell slices aligned with [`Dataset::columns`].
    pub fn rows(&self) -> impl Iterator<Item = &[Scalar]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Iterates over rows as `column -> cell` maps.
    pub fn records(&self) -> impl Iterator<Item = IndexMap<&str, &Scalar>> {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    /// Returns one cell by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Scalar> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Appends a row given positionally.
    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<(), SchemaError> {
        if row.len() != self.columns.len() {
            return Err(SchemaError::WidthMismatch {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Appends a row given as a `column -> cell` map.
    ///
    /// On an empty, column-less dataset the record's keys become the
    /// declared columns. Otherwise the record must carry exactly the
    /// declared columns, in any order.
    pub fn push_record(&mut self, record: IndexMap<String, Scalar>) -> Result<(), SchemaError> {
        if self.columns.is_empty() && self.rows.is_empty() {
            self.columns = record.keys().cloned().collect();
            self.rows.push(record.into_values().collect());
            return Ok(());
        }
        let mut record = record;
        if record.len() != self.columns.len()
            || !self.columns.iter().all(|c| record.contains_key(c))
        {
            return Err(SchemaError::ColumnMismatch {
                expected: self.columns.clone(),
                found: record.keys().cloned().collect(),
            });
        }
        let row = self
            .columns
            .iter()
            .map(|c| record.swap_remove(c).unwrap_or(Scalar::Missing))
            .collect();
        self.rows.push(row);
        Ok(())
    }

    /// Appends every row of `other`.
    ///
    /// A dataset with no declared columns adopts `other`'s columns. Column
    /// order may differ; rows of `other` are realigned to this dataset.
    pub fn append(&mut self, other: Dataset) -> Result<(), SchemaError> {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns.is_empty() && other.rows.is_empty() {
            return Ok(());
        }
        if other.columns == self.columns {
            self.rows.extend(other.rows);
            return Ok(());
        }
        let mapping: Option<Vec<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        let mapping = match mapping {
            Some(m) if other.columns.len() == self.columns.len() => m,
            _ => {
                return Err(SchemaError::ColumnMismatch {
                    expected: self.columns.clone(),
                    found: other.columns,
                });
            }
        };
        for row in other.rows {
            self.rows.push(mapping.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(())
    }
}
