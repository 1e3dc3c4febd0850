//! Per-symbol time series, fundamentals and technical indicators.
//!
//! Every call goes to `{base}query` with a `function` selector and an
//! `apikey` query parameter. Because all functions share that path, each
//! descriptor carries a cache scope built from the function name and its
//! static parameters (never the key).

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::models::endpoint::{EndpointDescriptor, RequestTemplate, ResponseShape};

pub const PROVIDER: &str = "av";
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/";

const PATH: &str = "query";
const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSize {
    /// The latest 100 points.
    #[default]
    Compact,
    /// The full history.
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

impl FromStr for OutputSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(OutputSize::Compact),
            "full" => Ok(OutputSize::Full),
            other => Err(format!("unknown outputsize `{other}`, expected compact or full")),
        }
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    #[default]
    Annual,
    Quarterly,
}

impl ReportPeriod {
    fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Annual => "annual",
            ReportPeriod::Quarterly => "quarterly",
        }
    }

    fn reports_key(&self) -> &'static str {
        match self {
            ReportPeriod::Annual => "annualReports",
            ReportPeriod::Quarterly => "quarterlyReports",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Ema,
    Sma,
    Rsi,
    Bbands,
}

impl Indicator {
    fn function(&self) -> &'static str {
        match self {
            Indicator::Ema => "EMA",
            Indicator::Sma => "SMA",
            Indicator::Rsi => "RSI",
            Indicator::Bbands => "BBANDS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorParams {
    pub interval: String,
    pub time_period: u32,
    pub series_type: String,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            interval: "daily".to_string(),
            time_period: 50,
            series_type: "close".to_string(),
        }
    }
}

/// One `function` of the provider together with its static parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvFunction {
    Daily(OutputSize),
    DailyAdjusted(OutputSize),
    Overview,
    IncomeStatement(ReportPeriod),
    Indicator(Indicator, IndicatorParams),
}

impl AvFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AvFunction::Daily(_) => "TIME_SERIES_DAILY",
            AvFunction::DailyAdjusted(_) => "TIME_SERIES_DAILY_ADJUSTED",
            AvFunction::Overview => "OVERVIEW",
            AvFunction::IncomeStatement(_) => "INCOME_STATEMENT",
            AvFunction::Indicator(indicator, _) => indicator.function(),
        }
    }

    fn shape(&self) -> ResponseShape {
        match self {
            AvFunction::Daily(_) | AvFunction::DailyAdjusted(_) => ResponseShape::Series {
                key: DAILY_SERIES_KEY.to_string(),
            },
            AvFunction::Overview => ResponseShape::Record,
            AvFunction::IncomeStatement(period) => ResponseShape::Reports {
                key: period.reports_key().to_string(),
            },
            AvFunction::Indicator(indicator, _) => ResponseShape::Series {
                key: format!("Technical Analysis: {}", indicator.function()),
            },
        }
    }

    fn static_params(&self) -> Vec<(&'static str, String)> {
        match self {
            AvFunction::Daily(size) | AvFunction::DailyAdjusted(size) => {
                vec![("outputsize", size.as_str().to_string())]
            }
            AvFunction::Overview => Vec::new(),
            AvFunction::IncomeStatement(period) => vec![("period", period.as_str().to_string())],
            AvFunction::Indicator(_, params) => vec![
                ("interval", params.interval.clone()),
                ("time_period", params.time_period.to_string()),
                ("series_type", params.series_type.clone()),
            ],
        }
    }

    /// `time-series-daily.compact`, `ema.daily.50.close`, `overview`, ...
    fn cache_scope(&self) -> String {
        std::iter::once(self.name().to_lowercase().replace('_', "-"))
            .chain(self.static_params().into_iter().map(|(_, v)| v))
            .collect::<Vec<_>>()
            .join(".")
    }
}

pub struct AlphaVantageProvider {
    base_url: String,
    api_key: SecretString,
}

impl AlphaVantageProvider {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Batch template varying `symbol`.
    pub fn template(&self, function: &AvFunction) -> RequestTemplate {
        let mut descriptor =
            EndpointDescriptor::new(PROVIDER, &self.base_url, PATH, function.shape())
                .query("function", function.name())
                .scoped(function.cache_scope());
        for (name, value) in function.static_params() {
            descriptor = descriptor.query(name, value);
        }
        descriptor = descriptor.query("apikey", self.api_key.expose_secret());
        RequestTemplate::new(descriptor, "symbol")
    }

    /// Single-symbol descriptor.
    pub fn descriptor(&self, function: &AvFunction, symbol: &str) -> EndpointDescriptor {
        self.template(function).specialize(symbol)
    }

    pub fn daily(&self, outputsize: OutputSize) -> RequestTemplate {
        self.template(&AvFunction::Daily(outputsize))
    }
}
