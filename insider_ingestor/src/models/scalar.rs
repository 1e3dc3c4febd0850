//! A single cell of a [`Dataset`](crate::models::dataset::Dataset).
//!
//! Providers hand back loosely typed JSON (prices arrive as strings, volumes
//! as numbers or strings depending on the endpoint). Every cell is routed
//! through [`Scalar::infer`] so that a value decoded from a response and the
//! same value read back from a cache file end up identical.

use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// No value. Written as an empty field.
    Missing,
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Scalar {
    /// Infers a scalar from its textual form.
    ///
    /// Rules, applied in order:
    /// - empty string -> `Missing`
    /// - `true` / `false` -> `Bool`
    /// - exactly `YYYY-MM-DD` -> `Date`
    /// - a plain decimal literal (digits, sign, point, exponent) -> `Number`
    /// - anything else -> `Text`
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Scalar::Missing;
        }
        match raw {
            "true" => return Scalar::Bool(true),
            "false" => return Scalar::Bool(false),
            _ => {}
        }
        if raw.len() == 10 {
            if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                return Scalar::Date(date);
            }
        }
        if looks_numeric(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                if n.is_finite() {
                    return Scalar::Number(n);
                }
            }
        }
        Scalar::Text(raw.to_string())
    }

    /// Converts a JSON value into a scalar.
    ///
    /// Strings go through [`Scalar::infer`]; nested arrays and objects are kept
    /// as their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Missing,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Scalar::Number(f),
                _ => Scalar::infer(&n.to_string()),
            },
            Value::String(s) => Scalar::infer(s),
            other => Scalar::infer(&other.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a calendar date, accepting either a `Date` cell or a text cell
    /// that starts with `YYYY-MM-DD` (e.g. `2021-01-04T00:00:00`).
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(d) => Some(*d),
            Scalar::Text(s) => s
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok()),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Missing => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Scalar::Date(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<Option<f64>> for Scalar {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Scalar::Missing, Scalar::Number)
    }
}

/// Cheap pre-check so that words `f64::from_str` happens to accept
/// (`inf`, `NaN`, `infinity`) stay text.
fn looks_numeric(raw: &str) -> bool {
    let mut has_digit = false;
    for (i, c) in raw.chars().enumerate() {
        match c {
            '0'..='9' => has_digit = true,
            '+' | '-' if i == 0 => {}
            '.' | 'e' | 'E' | '+' | '-' => {}
            _ => return false,
        }
    }
    has_digit && !raw.starts_with(['e', 'E'])
}
