//! Arrow IPC (feather) output through polars.
//!
//! Each dataset column becomes one typed polars column: all-number columns
//! are `Float64`, all-bool `Boolean`, all-date `Date`, anything else `String`.
//! Missing cells are nulls.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Datelike;
use polars::prelude::*;

use crate::io::sink::{DataSink, SinkError, write_atomic};
use crate::models::dataset::Dataset;
use crate::models::scalar::Scalar;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Number,
    Bool,
    Date,
    Text,
}

pub fn to_dataframe(dataset: &Dataset) -> Result<DataFrame, SinkError> {
    let mut columns = Vec::with_capacity(dataset.columns().len());
    for (idx, name) in dataset.columns().iter().enumerate() {
        let cells: Vec<&Scalar> = dataset.rows().map(|row| &row[idx]).collect();
        columns.push(to_column(name, &cells)?);
    }
    DataFrame::new(columns).map_err(SinkError::from)
}

fn to_column(name: &str, cells: &[&Scalar]) -> Result<Column, SinkError> {
    let column = match column_kind(cells) {
        Kind::Number => Column::new(
            name.into(),
            cells.iter().map(|c| c.as_f64()).collect::<Vec<_>>(),
        ),
        Kind::Bool => Column::new(
            name.into(),
            cells
                .iter()
                .map(|c| match c {
                    Scalar::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        Kind::Date => Column::new(
            name.into(),
            cells
                .iter()
                .map(|c| match c {
                    Scalar::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Date)?,
        Kind::Text => Column::new(
            name.into(),
            cells
                .iter()
                .map(|c| (!c.is_missing()).then(|| c.to_string()))
                .collect::<Vec<_>>(),
        ),
    };
    Ok(column)
}

fn column_kind(cells: &[&Scalar]) -> Kind {
    let mut kind = None;
    for cell in cells {
        let this = match cell {
            Scalar::Missing => continue,
            Scalar::Number(_) => Kind::Number,
            Scalar::Bool(_) => Kind::Bool,
            Scalar::Date(_) => Kind::Date,
            Scalar::Text(_) => Kind::Text,
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k == this => {}
            Some(_) => return Kind::Text,
        }
    }
    kind.unwrap_or(Kind::Text)
}

/// Writes `{dir}/{name}.feather`.
pub struct IpcSink {
    dir: PathBuf,
}

impl IpcSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DataSink for IpcSink {
    type Output = PathBuf;

    async fn write(&self, name: &str, dataset: &Dataset) -> Result<PathBuf, SinkError> {
        let mut df = to_dataframe(dataset)?;
        let mut bytes = Vec::new();
        IpcWriter::new(&mut bytes).finish(&mut df)?;
        write_atomic(&self.dir, &format!("{name}.feather"), &bytes).await
    }
}
