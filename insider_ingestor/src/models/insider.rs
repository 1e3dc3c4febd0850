use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::merge::IntegrityError;
use crate::models::dataset::Dataset;
use crate::models::scalar::Scalar;

pub const TICKER: &str = "Ticker";
pub const DATE: &str = "Date";

/// One insider transaction.
///
/// `ticker` and `date` are the raw cells of the source row; a row whose
/// cells do not form a usable (ticker, date) key is still a trade, it just
/// never matches a price bar. `fields` holds every other column in its
/// original order (`Name`, `fileDate`, `Shares`, `PricePerShare`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct InsiderTrade {
    pub ticker: Scalar,
    pub date: Scalar,
    pub fields: IndexMap<String, Scalar>,
}

impl InsiderTrade {
    pub fn new(ticker: &str, date: NaiveDate) -> Self {
        Self {
            ticker: Scalar::Text(ticker.to_string()),
            date: Scalar::Date(date),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// The join key, or `None` when the ticker is missing or the date does
    /// not parse.
    pub fn key(&self) -> Option<(String, NaiveDate)> {
        let ticker = match &self.ticker {
            Scalar::Missing => return None,
            other => other.to_string(),
        };
        Some((ticker, self.date.as_date()?))
    }

    /// Reads every row of `dataset`. Absent key columns read as missing
    /// cells, so no row is ever rejected here.
    pub fn from_dataset(dataset: &Dataset) -> Vec<Self> {
        dataset
            .records()
            .map(|record| {
                let cell = |name: &str| record.get(name).map_or(Scalar::Missing, |v| (*v).clone());
                let fields = record
                    .iter()
                    .filter(|(name, _)| **name != TICKER && **name != DATE)
                    .map(|(name, value)| (name.to_string(), (*value).clone()))
                    .collect();
                Self {
                    ticker: cell(TICKER),
                    date: cell(DATE),
                    fields,
                }
            })
            .collect()
    }
}

/// Fails unless both key columns are declared.
pub(crate) fn key_columns(dataset: &Dataset) -> Result<(), IntegrityError> {
    for column in [TICKER, DATE] {
        if dataset.column_index(column).is_none() && !dataset.is_empty() {
            return Err(IntegrityError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Reads the (ticker, date) key of one row, failing on a missing or
/// unparseable cell.
pub(crate) fn row_key(
    row: usize,
    record: &IndexMap<&str, &Scalar>,
) -> Result<(String, NaiveDate), IntegrityError> {
    let ticker = record
        .get(TICKER)
        .and_then(|v| match v {
            Scalar::Missing => None,
            other => Some(other.to_string()),
        })
        .ok_or_else(|| IntegrityError::MalformedRow {
            row,
            reason: format!("missing {TICKER}"),
        })?;
    let date = record
        .get(DATE)
        .and_then(|v| v.as_date())
        .ok_or_else(|| IntegrityError::MalformedRow {
            row,
            reason: format!("missing or unparseable {DATE}"),
        })?;
    Ok((ticker, date))
}
