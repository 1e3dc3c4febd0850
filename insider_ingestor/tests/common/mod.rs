#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use insider_ingestor::models::dataset::Dataset;
use insider_ingestor::models::endpoint::{EndpointDescriptor, RequestTemplate, ResponseShape};
use insider_ingestor::models::scalar::Scalar;
use insider_ingestor::providers::{DatasetSource, FetchError, Payload};
use insider_ingestor::requests::Sleeper;

/// Answers every `symbol` with one price row, except the ones told to fail.
#[derive(Default)]
pub struct ScriptedSource {
    pub fail: HashSet<String>,
    pub latency: Duration,
    pub calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn failing(symbols: &[&str]) -> Self {
        Self {
            fail: symbols.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DatasetSource for ScriptedSource {
    async fn fetch(&self, descriptor: &EndpointDescriptor) -> Result<Payload, FetchError> {
        let symbol = descriptor.param("symbol").unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(symbol.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.contains(&symbol) {
            return Err(FetchError::Status {
                status: 500,
                body: format!("no data for {symbol}"),
            });
        }
        Ok(Payload::Table(price_rows(&symbol, 1)))
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
}

/// `n` consecutive daily bars starting 2021-01-04.
pub fn price_rows(symbol: &str, n: u32) -> Dataset {
    let mut ds = Dataset::with_columns(["Ticker", "Date", "Close"]).unwrap();
    for i in 0..n {
        ds.push_row(vec![
            Scalar::Text(symbol.to_string()),
            Scalar::Date(day(4 + i)),
            Scalar::Number(10.0 + f64::from(i)),
        ])
        .unwrap();
    }
    ds
}

pub fn symbols(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("S{i:03}")).collect()
}

pub fn daily_template() -> RequestTemplate {
    let descriptor = EndpointDescriptor::new(
        "av",
        "http://localhost",
        "query",
        ResponseShape::Series {
            key: "Time Series (Daily)".into(),
        },
    )
    .query("function", "TIME_SERIES_DAILY")
    .scoped("time-series-daily.compact");
    RequestTemplate::new(descriptor, "symbol")
}
