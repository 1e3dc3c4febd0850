//! Turns a decoded [`Payload`] into rows according to a [`ResponseShape`].

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::models::dataset::Dataset;
use crate::models::endpoint::{EndpointDescriptor, ResponseShape};
use crate::models::insider::{DATE, TICKER};
use crate::providers::{FetchError, Payload};

pub fn into_dataset(
    payload: Payload,
    descriptor: &EndpointDescriptor,
) -> Result<Dataset, FetchError> {
    let symbol = descriptor.param("symbol");
    match (&descriptor.shape, payload) {
        (_, Payload::Table(dataset)) => Ok(dataset),
        (ResponseShape::Records, Payload::Document(map)) => {
            Err(FetchError::UnexpectedDocument(map.keys().cloned().collect()))
        }
        (ResponseShape::Record, Payload::Document(map)) => {
            if map.is_empty() {
                return Err(FetchError::Envelope(format!(
                    "empty response for {}",
                    symbol.unwrap_or(&descriptor.path_suffix)
                )));
            }
            Ok(Dataset::from_json_records(&[map]))
        }
        (ResponseShape::Series { key }, Payload::Document(map)) => series(map, key, symbol),
        (ResponseShape::Reports { key }, Payload::Document(map)) => reports(map, key, symbol),
    }
}

/// `{key: {"2021-01-04": {"1. open": "1.0", ...}, ...}}`, one row per date,
/// oldest first.
fn series(
    mut map: Map<String, Value>,
    key: &str,
    symbol: Option<&str>,
) -> Result<Dataset, FetchError> {
    let Some(Value::Object(points)) = map.remove(key) else {
        return Err(FetchError::UnexpectedDocument(map.keys().cloned().collect()));
    };

    let mut dated = Vec::with_capacity(points.len());
    for (stamp, fields) in points {
        let date = stamp
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| FetchError::Decode(format!("`{stamp}` is not a date")))?;
        let Value::Object(fields) = fields else {
            return Err(FetchError::Decode(format!("point `{stamp}` is not an object")));
        };
        dated.push((date, fields));
    }
    dated.sort_by_key(|(date, _)| *date);

    let rows: Vec<Map<String, Value>> = dated
        .into_iter()
        .map(|(date, fields)| {
            let mut row = keyed_row(symbol);
            row.insert(DATE.to_string(), Value::String(date.format("%Y-%m-%d").to_string()));
            row.extend(fields.into_iter().map(|(k, v)| (field_name(&k), v)));
            row
        })
        .collect();
    Ok(Dataset::from_json_records(&rows))
}

/// `{key: [{...}, {...}]}`, one row per report.
fn reports(
    mut map: Map<String, Value>,
    key: &str,
    symbol: Option<&str>,
) -> Result<Dataset, FetchError> {
    let Some(Value::Array(items)) = map.remove(key) else {
        return Err(FetchError::UnexpectedDocument(map.keys().cloned().collect()));
    };
    let rows = items
        .into_iter()
        .map(|item| match item {
            Value::Object(fields) => {
                let mut row = keyed_row(symbol);
                row.extend(fields);
                Ok(row)
            }
            other => Err(FetchError::Decode(format!("report is not an object: {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Dataset::from_json_records(&rows))
}

fn keyed_row(symbol: Option<&str>) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert(
        TICKER.to_string(),
        symbol.map_or(Value::Null, |s| Value::String(s.to_string())),
    );
    row
}

/// `"4. close"` -> `"Close"`, `"5. adjusted close"` -> `"Adjusted Close"`.
/// Names without a numbered prefix keep their words, title-cased.
pub fn field_name(raw: &str) -> String {
    let name = match raw.split_once(". ") {
        Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => raw,
    };
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
