//! End-to-end orchestration: insiders -> symbol universe -> windowed daily
//! prices -> merge -> persist.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use secrecy::SecretString;
use shared_utils::config::ConfigError;
use tracing::info;

use crate::cache::DiskCache;
use crate::config::{Credentials, IngestorConfig, OutputCfg, OutputFormat};
use crate::errors::Error;
use crate::io::{CsvSink, DataSink, IpcSink};
use crate::merge::{IntegrityError, merge_datasets};
use crate::models::dataset::Dataset;
use crate::models::insider::TICKER;
use crate::models::scalar::Scalar;
use crate::providers::alpha_vantage::{AlphaVantageProvider, AvFunction};
use crate::providers::http::HttpFetcher;
use crate::providers::quiver::{self, QuiverProvider};
use crate::providers::{DatasetSource, alpha_vantage};
use crate::requests::{
    BatchFetcher, CancelSignal, RunReport, Sleeper, TokioSleeper, WindowedScheduler, fetch_cached,
};

pub const INSIDERS_OUTPUT: &str = "qq_live_insiders";
pub const PRICES_OUTPUT: &str = "av_agg_daily_series";
pub const MERGED_OUTPUT: &str = "insiders_enriched";

/// Outcome of [`Ingestor::run`].
#[derive(Debug)]
pub struct PipelineReport {
    pub insider_rows: usize,
    pub insiders_output: PathBuf,
    pub prices: RunReport,
    pub merged_rows: usize,
    pub merged_output: PathBuf,
}

pub struct Ingestor {
    config: IngestorConfig,
    quiver: QuiverProvider,
    alpha_vantage: AlphaVantageProvider,
    fetcher: BatchFetcher,
    sink: Arc<dyn DataSink<Output = PathBuf>>,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancelSignal,
}

impl Ingestor {
    /// Validates `config` and checks both credentials before anything touches
    /// the network.
    pub fn new(config: IngestorConfig, credentials: Credentials) -> Result<Self, Error> {
        config.validate()?;
        let (qq_key, av_key) = require_credentials(credentials)?;
        let source = Arc::new(HttpFetcher::new(config.http.request_timeout())?);
        Ok(Self::assemble(config, qq_key, av_key, source))
    }

    /// Like [`Ingestor::new`], with a caller-supplied source.
    pub fn with_source(
        config: IngestorConfig,
        credentials: Credentials,
        source: Arc<dyn DatasetSource>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let (qq_key, av_key) = require_credentials(credentials)?;
        Ok(Self::assemble(config, qq_key, av_key, source))
    }

    fn assemble(
        config: IngestorConfig,
        qq_key: SecretString,
        av_key: SecretString,
        source: Arc<dyn DatasetSource>,
    ) -> Self {
        let cache = Arc::new(DiskCache::new(&config.cache.dir));
        Self {
            quiver: QuiverProvider::new(&config.quiver.base_url, qq_key),
            alpha_vantage: AlphaVantageProvider::new(&config.alpha_vantage.base_url, av_key),
            fetcher: BatchFetcher::new(source, cache),
            sink: sink_for(&config.output),
            sleeper: Arc::new(TokioSleeper),
            cancel: CancelSignal::new(),
            config,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &IngestorConfig {
        &self.config
    }

    /// Cancels a running [`Ingestor::daily_prices`] between two windows.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// The live insider dataset, served from the cache when present.
    pub async fn live_insiders(&self) -> Result<Dataset, Error> {
        let descriptor = self.quiver.live_insiders();
        let (dataset, status) =
            fetch_cached(self.fetcher.source(), self.fetcher.cache(), &descriptor, None).await?;
        info!(rows = dataset.len(), ?status, "insider activity loaded");
        Ok(dataset)
    }

    /// Daily bars for `symbols`, fetched in rate-limited windows and
    /// persisted as one aggregate.
    pub async fn daily_prices(&self, symbols: Vec<String>) -> Result<RunReport, Error> {
        let outputsize = self.config.alpha_vantage.outputsize()?;
        self.collect(PRICES_OUTPUT, &AvFunction::Daily(outputsize), symbols)
            .await
    }

    /// Any per-symbol function, fetched in rate-limited windows.
    pub async fn collect(
        &self,
        name: &str,
        function: &AvFunction,
        symbols: Vec<String>,
    ) -> Result<RunReport, Error> {
        let template = self.alpha_vantage.template(function);
        WindowedScheduler::new(self.fetcher.clone())
            .with_sleeper(self.sleeper.clone())
            .with_sink(self.sink.clone())
            .with_cancel(self.cancel.clone())
            .run(name, symbols, &template, self.config.schedule.to_schedule())
            .await
    }

    /// Writes `dataset` through the configured output sink.
    pub async fn persist(&self, name: &str, dataset: &Dataset) -> Result<PathBuf, Error> {
        Ok(self.sink.write(name, dataset).await?)
    }

    pub fn merge_enriched(&self, insiders: &Dataset, prices: &Dataset) -> Result<Dataset, Error> {
        Ok(merge_datasets(insiders, prices)?)
    }

    pub async fn run(&self) -> Result<PipelineReport, Error> {
        let insiders = self.live_insiders().await?;
        let insiders_output = self.persist(INSIDERS_OUTPUT, &insiders).await?;

        let symbols = symbols_by_activity(&insiders)?;
        info!(
            symbols = symbols.len(),
            provider = alpha_vantage::PROVIDER,
            "collecting daily prices"
        );
        let prices = self.daily_prices(symbols).await?;

        let merged = self.merge_enriched(&insiders, &prices.dataset)?;
        let merged_output = self.persist(MERGED_OUTPUT, &merged).await?;
        info!(rows = merged.len(), path = %merged_output.display(), "merged dataset written");

        Ok(PipelineReport {
            insider_rows: insiders.len(),
            insiders_output,
            prices,
            merged_rows: merged.len(),
            merged_output,
        })
    }
}

fn require_credentials(
    credentials: Credentials,
) -> Result<(SecretString, SecretString), ConfigError> {
    let qq = credentials
        .quiver
        .ok_or_else(|| ConfigError::MissingCredential(quiver::PROVIDER.to_string()))?;
    let av = credentials
        .alpha_vantage
        .ok_or_else(|| ConfigError::MissingCredential(alpha_vantage::PROVIDER.to_string()))?;
    Ok((qq, av))
}

pub fn sink_for(output: &OutputCfg) -> Arc<dyn DataSink<Output = PathBuf>> {
    match output.format {
        OutputFormat::Csv => Arc::new(CsvSink::new(&output.dir)),
        OutputFormat::Ipc => Arc::new(IpcSink::new(&output.dir)),
    }
}

/// Distinct tickers of an insider dataset, most active first. Ties keep the
/// order of first appearance.
pub fn symbols_by_activity(insiders: &Dataset) -> Result<Vec<String>, IntegrityError> {
    if insiders.is_empty() {
        return Ok(Vec::new());
    }
    let idx = insiders
        .column_index(TICKER)
        .ok_or_else(|| IntegrityError::MissingColumn(TICKER.to_string()))?;

    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for row in insiders.rows() {
        match &row[idx] {
            Scalar::Missing => {}
            ticker => *counts.entry(ticker.to_string()).or_default() += 1,
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked.into_iter().map(|(ticker, _)| ticker).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_active_ticker_comes_first() {
        let mut ds = Dataset::with_columns(["Ticker", "Shares"]).unwrap();
        for t in ["BBB", "AAA", "CCC", "AAA", "CCC", "AAA"] {
            ds.push_row(vec![t.into(), 1.0.into()]).unwrap();
        }
        ds.push_row(vec![Scalar::Missing, 1.0.into()]).unwrap();
        assert_eq!(symbols_by_activity(&ds).unwrap(), ["AAA", "CCC", "BBB"]);
    }

    #[test]
    fn ties_keep_first_appearance() {
        let mut ds = Dataset::with_columns(["Ticker"]).unwrap();
        for t in ["ZZZ", "AAA", "MMM"] {
            ds.push_row(vec![t.into()]).unwrap();
        }
        assert_eq!(symbols_by_activity(&ds).unwrap(), ["ZZZ", "AAA", "MMM"]);
    }

    #[test]
    fn missing_credential_fails_before_network() {
        let creds = Credentials {
            quiver: Some(SecretString::new("qq".into())),
            alpha_vantage: None,
        };
        match Ingestor::new(IngestorConfig::default(), creds) {
            Err(Error::Config(ConfigError::MissingCredential(provider))) => {
                assert_eq!(provider, "av")
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected a missing credential error"),
        }
    }
}
