//! Rate-Limited Windowed Scheduler.
//!
//! A [`BatchJob`] splits its parameter list into consecutive windows of
//! `window_size` values. The scheduler walks the job through
//!
//! ```text
//! Idle -> Dispatching(0) -> Waiting(1) -> Dispatching(1) -> ... -> Finalizing -> Done
//! ```
//!
//! Each window is handed to the [`BatchFetcher`] as a whole and its results
//! are folded into the aggregate before anything else happens. Between two
//! windows the loop suspends for `window_delay`, which is what keeps the
//! call rate under the provider's per-minute ceiling. There is no delay
//! after the last window. A [`CancelSignal`] is honoured while waiting: the
//! run then finalizes with what it has.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use shared_utils::config::ConfigError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::Error;
use crate::io::DataSink;
use crate::models::dataset::Dataset;
use crate::models::endpoint::RequestTemplate;
use crate::providers::FetchError;
use crate::requests::batch_request::{BatchFetcher, BatchOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub window_size: usize,
    pub window_delay: Duration,
    pub pool_size: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            window_size: 25,
            window_delay: Duration::from_secs(70),
            pool_size: 10,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::invalid("schedule.window_size", "must be at least 1"));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::invalid("schedule.pool_size", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Dispatching { window: usize },
    Waiting { next: usize },
    Finalizing,
    Done,
}

/// A parameter list being worked through window by window.
///
/// Only the scheduler's own loop mutates a job, and only between windows.
#[derive(Debug)]
pub struct BatchJob {
    values: Vec<String>,
    schedule: ScheduleConfig,
    aggregate: Dataset,
    cursor: usize,
    state: SchedulerState,
}

impl BatchJob {
    /// Validates the schedule and de-duplicates `values`, keeping first
    /// occurrences in order.
    pub fn new(
        values: impl IntoIterator<Item = String>,
        schedule: ScheduleConfig,
    ) -> Result<Self, ConfigError> {
        schedule.validate()?;
        let mut seen = HashSet::new();
        let values: Vec<String> = values
            .into_iter()
            .filter(|v| seen.insert(v.clone()))
            .collect();
        if values.is_empty() {
            return Err(ConfigError::EmptyParameterList);
        }
        Ok(Self {
            values,
            schedule,
            aggregate: Dataset::default(),
            cursor: 0,
            state: SchedulerState::Idle,
        })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn aggregate(&self) -> &Dataset {
        &self.aggregate
    }

    pub fn window_count(&self) -> usize {
        self.values.len().div_ceil(self.schedule.window_size)
    }

    pub fn window_sizes(&self) -> Vec<usize> {
        self.values
            .chunks(self.schedule.window_size)
            .map(<[String]>::len)
            .collect()
    }

    fn window_bounds(&self, window: usize) -> (usize, usize) {
        let start = (window * self.schedule.window_size).min(self.values.len());
        let end = (start + self.schedule.window_size).min(self.values.len());
        (start, end)
    }

    /// Appends a window's successful rows in input order. A dataset whose
    /// columns do not fit the aggregate is skipped like a failed fetch.
    fn fold(&mut self, window: usize, outcome: BatchOutcome, report: &mut RunReport) {
        let (start, end) = self.window_bounds(window);
        let position: HashMap<&str, usize> = self.values[start..end]
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect();
        let mut succeeded = outcome.succeeded;
        succeeded.sort_by_key(|(value, _)| position.get(value.as_str()).copied());

        for (value, dataset) in succeeded {
            match self.aggregate.append(dataset) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!(value = %value, error = %e, "rows do not fit the aggregate, skipping");
                    report.skipped.push((value, FetchError::Schema(e)));
                }
            }
        }
        report.skipped.extend(outcome.failed);
        report.cache_hits += outcome.cache_hits;
        self.cursor = end;
    }
}

/// What a scheduler run produced and what it had to leave out.
#[derive(Debug)]
pub struct RunReport {
    pub name: String,
    pub dataset: Dataset,
    pub requested: usize,
    pub succeeded: usize,
    pub skipped: Vec<(String, FetchError)>,
    /// Values never dispatched because the run was cancelled.
    pub unattempted: Vec<String>,
    /// Windows dispatched.
    pub windows: usize,
    /// Start of each dispatched window, relative to the first.
    pub window_offsets: Vec<Duration>,
    pub cache_hits: usize,
    pub cancelled: bool,
    pub output: Option<PathBuf>,
}

impl RunReport {
    fn new(name: &str, requested: usize) -> Self {
        Self {
            name: name.to_string(),
            dataset: Dataset::default(),
            requested,
            succeeded: 0,
            skipped: Vec::new(),
            unattempted: Vec::new(),
            windows: 0,
            window_offsets: Vec::new(),
            cache_hits: 0,
            cancelled: false,
            output: None,
        }
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} succeeded, {} skipped of {} requested",
            self.succeeded,
            self.skipped.len(),
            self.requested
        );
        if self.cancelled {
            line.push_str(&format!(", cancelled with {} not dispatched", self.unattempted.len()));
        }
        line
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Cloneable flag that asks a running scheduler to stop between windows.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelSignal::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

pub struct WindowedScheduler {
    fetcher: BatchFetcher,
    sleeper: Arc<dyn Sleeper>,
    sink: Option<Arc<dyn DataSink<Output = PathBuf>>>,
    cancel: CancelSignal,
}

impl WindowedScheduler {
    pub fn new(fetcher: BatchFetcher) -> Self {
        Self {
            fetcher,
            sleeper: Arc::new(TokioSleeper),
            sink: None,
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Persists the final aggregate through `sink` when a run finalizes.
    pub fn with_sink(mut self, sink: Arc<dyn DataSink<Output = PathBuf>>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Fetches every value through `template`, window by window, and returns
    /// the union of all successful rows.
    ///
    /// Fails before any network call when `values` is empty or the schedule
    /// is invalid. Per-value failures are reported in
    /// [`RunReport::skipped`], never as an error.
    pub async fn run(
        &self,
        name: &str,
        values: Vec<String>,
        template: &RequestTemplate,
        schedule: ScheduleConfig,
    ) -> Result<RunReport, Error> {
        let job = BatchJob::new(values, schedule)?;
        self.run_job(name, job, template).await
    }

    pub async fn run_job(
        &self,
        name: &str,
        mut job: BatchJob,
        template: &RequestTemplate,
    ) -> Result<RunReport, Error> {
        let total = job.window_count();
        let mut report = RunReport::new(name, job.values.len());
        let mut started: Option<Instant> = None;

        loop {
            match job.state {
                SchedulerState::Idle => {
                    info!(
                        run = name,
                        values = job.values.len(),
                        windows = total,
                        window_size = job.schedule.window_size,
                        "starting windowed run"
                    );
                    job.state = SchedulerState::Dispatching { window: 0 };
                }
                SchedulerState::Dispatching { window } => {
                    let origin = *started.get_or_insert_with(Instant::now);
                    report.window_offsets.push(origin.elapsed());
                    report.windows += 1;

                    let (start, end) = job.window_bounds(window);
                    info!(
                        run = name,
                        window = window + 1,
                        of = total,
                        size = end - start,
                        "dispatching window"
                    );
                    let outcome = self
                        .fetcher
                        .fetch_all(&job.values[start..end], template, job.schedule.pool_size)
                        .await?;
                    debug!(
                        window = window + 1,
                        succeeded = outcome.succeeded.len(),
                        failed = outcome.failed.len(),
                        "window complete"
                    );
                    job.fold(window, outcome, &mut report);

                    job.state = if job.cursor < job.values.len() {
                        SchedulerState::Waiting { next: window + 1 }
                    } else {
                        SchedulerState::Finalizing
                    };
                }
                SchedulerState::Waiting { next } => {
                    let cancelled = if self.cancel.is_cancelled() {
                        true
                    } else {
                        info!(
                            run = name,
                            delay_secs = job.schedule.window_delay.as_secs_f64(),
                            "waiting before next window"
                        );
                        tokio::select! {
                            _ = self.sleeper.sleep(job.schedule.window_delay) => false,
                            _ = self.cancel.cancelled() => true,
                        }
                    };
                    if cancelled {
                        report.cancelled = true;
                        report.unattempted = job.values[job.cursor..].to_vec();
                        warn!(
                            run = name,
                            remaining = report.unattempted.len(),
                            "run cancelled between windows"
                        );
                        job.state = SchedulerState::Finalizing;
                    } else {
                        job.state = SchedulerState::Dispatching { window: next };
                    }
                }
                SchedulerState::Finalizing => {
                    if let Some(sink) = &self.sink {
                        report.output = Some(sink.write(name, &job.aggregate).await?);
                    }
                    job.state = SchedulerState::Done;
                }
                SchedulerState::Done => break,
            }
        }

        report.dataset = std::mem::take(&mut job.aggregate);
        info!(run = name, rows = report.dataset.len(), "{}", report.summary());
        Ok(report)
    }
}
