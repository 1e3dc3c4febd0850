use indexmap::IndexMap;

use crate::models::dataset::{Dataset, SchemaError};
use crate::models::insider::{DATE, TICKER};
use crate::models::price_bar::PriceBar;
use crate::models::scalar::Scalar;

/// An insider row enriched with the price bar of the same (ticker, date).
///
/// `ticker` and `date` are the insider row's key cells; a parsed date is
/// normalized to a calendar day, an unusable one is kept as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub ticker: Scalar,
    pub date: Scalar,
    pub insider: IndexMap<String, Scalar>,
    pub price: Option<PriceBar>,
}

impl MergedRecord {
    pub fn close(&self) -> Option<f64> {
        self.price.as_ref().and_then(PriceBar::close)
    }

    /// Flattens records into `Ticker, Date, <insider columns>, <price_columns>`.
    ///
    /// A price column a bar lacks is a missing cell. An insider column
    /// sharing a name with a price column is kept under `insider_<name>`.
    pub fn to_dataset(
        records: &[MergedRecord],
        price_columns: &[String],
    ) -> Result<Dataset, SchemaError> {
        let mut dataset = Dataset::default();
        for record in records {
            let mut row: IndexMap<String, Scalar> = IndexMap::new();
            row.insert(TICKER.to_string(), record.ticker.clone());
            row.insert(DATE.to_string(), record.date.clone());
            for (name, value) in &record.insider {
                let name = if price_columns.contains(name) {
                    format!("insider_{name}")
                } else {
                    name.clone()
                };
                row.insert(name, value.clone());
            }
            for name in price_columns {
                let cell = record
                    .price
                    .as_ref()
                    .and_then(|bar| bar.fields.get(name))
                    .cloned()
                    .unwrap_or(Scalar::Missing);
                row.insert(name.clone(), cell);
            }
            dataset.push_record(row)?;
        }
        Ok(dataset)
    }
}
