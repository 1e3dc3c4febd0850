//! Left join of insider activity against a daily price series.
//!
//! Keys are compared exactly as both inputs carry them: a ticker string and
//! a calendar date. Every insider row appears in the output exactly once, in
//! input order; rows without a matching bar get `None` (and therefore
//! missing cells once flattened). That includes insider rows whose ticker is
//! missing or whose date does not parse: they cannot match anything but are
//! still part of the output.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::dataset::{Dataset, SchemaError};
use crate::models::insider::InsiderTrade;
use crate::models::merged::MergedRecord;
use crate::models::price_bar::PriceBar;
use crate::models::scalar::Scalar;

/// Violations of cache or merge invariants. These are never absorbed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("price series has more than one row for ({ticker}, {date})")]
    DuplicatePriceKey { ticker: String, date: NaiveDate },

    #[error("dataset has no `{0}` column")]
    MissingColumn(String),

    #[error("row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("cache key `{key}` already maps to a different request")]
    KeyCollision { key: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub fn merge(
    insiders: &[InsiderTrade],
    prices: &[PriceBar],
) -> Result<Vec<MergedRecord>, IntegrityError> {
    let mut index: HashMap<(&str, NaiveDate), &PriceBar> = HashMap::with_capacity(prices.len());
    for bar in prices {
        if index.insert((bar.ticker.as_str(), bar.date), bar).is_some() {
            return Err(IntegrityError::DuplicatePriceKey {
                ticker: bar.ticker.clone(),
                date: bar.date,
            });
        }
    }

    let mut unkeyed = 0;
    let merged: Vec<MergedRecord> = insiders
        .iter()
        .enumerate()
        .map(|(row, trade)| match trade.key() {
            Some((ticker, date)) => MergedRecord {
                ticker: trade.ticker.clone(),
                date: Scalar::Date(date),
                insider: trade.fields.clone(),
                price: index.get(&(ticker.as_str(), date)).map(|b| (*b).clone()),
            },
            None => {
                unkeyed += 1;
                warn!(
                    row,
                    ticker = %trade.ticker,
                    date = %trade.date,
                    "insider row has no usable key, kept without prices"
                );
                MergedRecord {
                    ticker: trade.ticker.clone(),
                    date: trade.date.clone(),
                    insider: trade.fields.clone(),
                    price: None,
                }
            }
        })
        .collect();

    debug!(
        rows = merged.len(),
        matched = merged.iter().filter(|m| m.price.is_some()).count(),
        unkeyed,
        "merged insider activity with prices"
    );
    Ok(merged)
}

/// Runs [`merge`] on untyped datasets and flattens the result. The output
/// carries every value column of `prices` in its order.
pub fn merge_datasets(insiders: &Dataset, prices: &Dataset) -> Result<Dataset, IntegrityError> {
    let trades = InsiderTrade::from_dataset(insiders);
    let bars = PriceBar::from_dataset(prices)?;
    let merged = merge(&trades, &bars)?;
    Ok(MergedRecord::to_dataset(&merged, &PriceBar::value_columns(prices))?)
}
