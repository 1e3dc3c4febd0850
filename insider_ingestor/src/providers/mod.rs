//! Provider abstraction for tabular HTTP data sources.
//!
//! A [`DatasetSource`] turns an [`EndpointDescriptor`] into a [`Payload`].
//! The live implementation is [`http::HttpFetcher`]; tests plug in their own
//! sources to drive the batch and scheduling layers without a network.
//!
//! [`quiver`] and [`alpha_vantage`] only build descriptors. They hold the
//! credentials and know each vendor's paths, parameters and response shapes.

pub mod alpha_vantage;
pub mod errors;
pub mod http;
pub mod quiver;
pub mod shape;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::models::dataset::Dataset;
use crate::models::endpoint::EndpointDescriptor;

pub use errors::{FailureKind, FetchError};

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A list of row objects.
    Table(Dataset),
    /// A single JSON object. Whether this is data or metadata depends on the
    /// descriptor's [`ResponseShape`](crate::models::endpoint::ResponseShape).
    Document(Map<String, Value>),
}

#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, descriptor: &EndpointDescriptor) -> Result<Payload, FetchError>;
}
