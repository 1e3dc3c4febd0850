use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::merge::IntegrityError;
use crate::models::dataset::Dataset;
use crate::models::insider::{DATE, TICKER, key_columns, row_key};
use crate::models::scalar::Scalar;

/// Price columns of a daily bar. A merge against a price dataset that
/// declares no value columns of its own still emits these.
pub const PRICE_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// One daily bar of a symbol. `fields` holds every non-key column of the
/// source row (`Open`, ..., `Adjusted Close`, `Dividend Amount`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub fields: IndexMap<String, Scalar>,
}

impl PriceBar {
    pub fn new(ticker: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            fields: IndexMap::new(),
        }
    }

    pub fn with_close(self, close: f64) -> Self {
        self.with_field("Close", close)
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn close(&self) -> Option<f64> {
        self.fields.get("Close").and_then(Scalar::as_f64)
    }

    /// Reads every row of `dataset`; each row needs a ticker and a date.
    pub fn from_dataset(dataset: &Dataset) -> Result<Vec<Self>, IntegrityError> {
        key_columns(dataset)?;
        dataset
            .records()
            .enumerate()
            .map(|(row, record)| {
                let (ticker, date) = row_key(row, &record)?;
                let fields = record
                    .iter()
                    .filter(|(name, _)| **name != TICKER && **name != DATE)
                    .map(|(name, value)| (name.to_string(), (*value).clone()))
                    .collect();
                Ok(Self {
                    ticker,
                    date,
                    fields,
                })
            })
            .collect()
    }

    /// The value columns a merge against `dataset` emits, in source order.
    pub fn value_columns(dataset: &Dataset) -> Vec<String> {
        let columns: Vec<String> = dataset
            .columns()
            .iter()
            .filter(|c| c.as_str() != TICKER && c.as_str() != DATE)
            .cloned()
            .collect();
        if columns.is_empty() {
            PRICE_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            columns
        }
    }
}
