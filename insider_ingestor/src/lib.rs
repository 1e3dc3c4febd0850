//! Ingestion engine for insider-trading activity enriched with daily prices.
//!
//! Insider transactions come from one provider as a single live dataset;
//! per-symbol time series come from a second, rate-limited provider and are
//! collected in delayed windows. Every request goes through a CSV disk cache,
//! and the two datasets are finally left-joined on (ticker, date).

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod io;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod requests;

pub use config::{Credentials, IngestorConfig};
pub use errors::Error;
pub use pipeline::Ingestor;
