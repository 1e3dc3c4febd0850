//! Delimited text layout shared by cache entries and CSV outputs.
//!
//! The first column is an unnamed row index (`0..n`); the remaining columns
//! are the dataset's declared columns. Missing cells are empty fields.

use std::path::Path;

use crate::cache::CacheError;
use crate::models::dataset::Dataset;
use crate::models::scalar::Scalar;

pub fn to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(std::iter::once("").chain(dataset.columns().iter().map(String::as_str)))?;
    for (index, row) in dataset.rows().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(index.to_string());
        record.extend(row.iter().map(Scalar::to_string));
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Parses bytes written by [`to_csv_bytes`]. `path` is only used in errors.
pub fn from_csv_bytes(bytes: &[u8], path: &Path) -> Result<Dataset, CacheError> {
    let csv_error = |source| CacheError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader.headers().map_err(csv_error)?.clone();
    // Files written by other tools may lack the index column.
    let skip = usize::from(headers.get(0) == Some(""));
    let mut dataset = Dataset::with_columns(headers.iter().skip(skip))?;
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        dataset.push_row(record.iter().skip(skip).map(Scalar::infer).collect())?;
    }
    Ok(dataset)
}
