//! Insider-activity endpoints (bearer-token auth).

use secrecy::{ExposeSecret, SecretString};

use crate::models::endpoint::{EndpointDescriptor, ResponseShape};

pub const PROVIDER: &str = "qq";
pub const DEFAULT_BASE_URL: &str = "https://api.quiverquant.com/";

pub struct QuiverProvider {
    base_url: String,
    api_key: SecretString,
}

impl QuiverProvider {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    /// The latest insider transactions across all tickers.
    pub fn live_insiders(&self) -> EndpointDescriptor {
        EndpointDescriptor::new(
            PROVIDER,
            &self.base_url,
            "beta/live/insiders",
            ResponseShape::Records,
        )
        .header("Accept", "application/json")
        .header(
            "Authorization",
            format!("Bearer {}", self.api_key.expose_secret()),
        )
        .query("limit_codes", "true")
    }
}
