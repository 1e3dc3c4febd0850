use std::time::Duration;

use httpmock::prelude::*;
use insider_ingestor::models::endpoint::{EndpointDescriptor, ResponseShape};
use insider_ingestor::models::scalar::Scalar;
use insider_ingestor::providers::alpha_vantage::{AlphaVantageProvider, AvFunction, OutputSize};
use insider_ingestor::providers::http::HttpFetcher;
use insider_ingestor::providers::quiver::QuiverProvider;
use insider_ingestor::providers::shape::into_dataset;
use insider_ingestor::providers::{DatasetSource, FailureKind, FetchError, Payload};
use secrecy::SecretString;
use serde_json::json;

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn insiders_request_sends_bearer_and_decodes_rows() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/beta/live/insiders")
                .header("Authorization", "Bearer qq-key")
                .header("Accept", "application/json")
                .query_param("limit_codes", "true");
            then.status(200).json_body(json!([
                {"Ticker": "AAA", "Date": "2021-01-04T00:00:00", "Name": "Doe", "Shares": 1500.0},
                {"Ticker": "BBB", "Date": "2021-01-05T00:00:00", "Name": "Roe", "Shares": "200"}
            ]));
        })
        .await;

    let quiver = QuiverProvider::new(server.base_url(), SecretString::new("qq-key".into()));
    let payload = fetcher().fetch(&quiver.live_insiders()).await.unwrap();
    mock.assert_async().await;

    let Payload::Table(ds) = payload else {
        panic!("expected rows");
    };
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.columns(), ["Ticker", "Date", "Name", "Shares"]);
    assert_eq!(ds.value(1, "Shares"), Some(&Scalar::Number(200.0)));
}

#[tokio::test]
async fn daily_series_is_shaped_into_bars() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/query")
                .query_param("function", "TIME_SERIES_DAILY")
                .query_param("symbol", "AAA")
                .query_param("outputsize", "compact")
                .query_param("apikey", "av-key");
            then.status(200).json_body(json!({
                "Meta Data": {"2. Symbol": "AAA"},
                "Time Series (Daily)": {
                    "2021-01-05": {
                        "1. open": "10.5", "2. high": "11", "3. low": "10",
                        "4. close": "10.8", "5. volume": "1200"
                    },
                    "2021-01-04": {
                        "1. open": "9.5", "2. high": "10.2", "3. low": "9.1",
                        "4. close": "10.0", "5. volume": "900"
                    }
                }
            }));
        })
        .await;

    let av = AlphaVantageProvider::new(server.base_url(), SecretString::new("av-key".into()));
    let descriptor = av.descriptor(&AvFunction::Daily(OutputSize::Compact), "AAA");
    let payload = fetcher().fetch(&descriptor).await.unwrap();
    mock.assert_async().await;

    let ds = into_dataset(payload, &descriptor).unwrap();
    assert_eq!(ds.columns(), ["Ticker", "Date", "Open", "High", "Low", "Close", "Volume"]);
    assert_eq!(ds.value(0, "Close"), Some(&Scalar::Number(10.0)));
    assert_eq!(ds.value(1, "Volume"), Some(&Scalar::Number(1200.0)));
}

#[tokio::test]
async fn non_success_status_is_a_provider_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/query");
            then.status(503).body("upstream unavailable");
        })
        .await;

    let descriptor =
        EndpointDescriptor::new("av", server.base_url(), "query", ResponseShape::Record);
    let err = fetcher().fetch(&descriptor).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Provider);
    assert!(matches!(
        err,
        FetchError::Status { status: 503, ref body } if body == "upstream unavailable"
    ));
}

#[tokio::test]
async fn error_envelope_with_200_is_a_provider_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/query");
            then.status(200).json_body(json!({
                "Error Message": "Invalid API call. Please retry or visit the documentation."
            }));
        })
        .await;

    let descriptor =
        EndpointDescriptor::new("av", server.base_url(), "query", ResponseShape::Record);
    let err = fetcher().fetch(&descriptor).await.unwrap_err();
    assert!(matches!(err, FetchError::Envelope(_)));
    assert_eq!(err.kind(), FailureKind::Provider);
}

#[tokio::test]
async fn slow_response_times_out_as_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/beta/live/insiders");
            then.status(200).json_body(json!([])).delay(Duration::from_millis(800));
        })
        .await;

    let fetcher = HttpFetcher::new(Duration::from_millis(100)).unwrap();
    let descriptor = EndpointDescriptor::new(
        "qq",
        server.base_url(),
        "beta/live/insiders",
        ResponseShape::Records,
    );
    let err = fetcher.fetch(&descriptor).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let descriptor =
        EndpointDescriptor::new("qq", "http://127.0.0.1:9", "x", ResponseShape::Records);
    let err = fetcher().fetch(&descriptor).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transport);
}
