//! Single Fetcher: one GET per descriptor, with status and envelope checks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::dataset::Dataset;
use crate::models::endpoint::EndpointDescriptor;
use crate::providers::{DatasetSource, FetchError, Payload};

/// Longest response body kept in a [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Keys that only ever appear in a body holding rate-limit or usage notices.
const NOTICE_KEYS: [&str; 2] = ["Note", "Information"];

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher whose every call gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatasetSource for HttpFetcher {
    async fn fetch(&self, descriptor: &EndpointDescriptor) -> Result<Payload, FetchError> {
        let url = descriptor.url();
        debug!(provider = %descriptor.provider, url = %url, "GET");

        let query: Vec<(&str, &str)> = descriptor
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut request = self.client.get(&url).query(&query);
        for (name, value) in &descriptor.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        decode_body(&body)
    }
}

/// Decodes a 2xx body.
///
/// An array of objects becomes [`Payload::Table`]; an object is checked for
/// a provider error envelope and otherwise returned as [`Payload::Document`].
pub fn decode_body(body: &str) -> Result<Payload, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    match value {
        Value::Array(items) => {
            let records = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(FetchError::Decode(format!(
                        "element {i} is not an object: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Payload::Table(Dataset::from_json_records(&records)))
        }
        Value::Object(map) => match envelope_message(&map) {
            Some(message) => Err(FetchError::Envelope(message)),
            None => Ok(Payload::Document(map)),
        },
        other => Err(FetchError::Decode(format!(
            "expected a JSON array or object, got `{other}`"
        ))),
    }
}

fn envelope_message(map: &Map<String, Value>) -> Option<String> {
    if let Some(message) = map.get("Error Message") {
        return Some(plain(message));
    }
    if !map.is_empty() && map.keys().all(|k| NOTICE_KEYS.contains(&k.as_str())) {
        let notices: Vec<String> = map.values().map(plain).collect();
        return Some(notices.join(" "));
    }
    None
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
