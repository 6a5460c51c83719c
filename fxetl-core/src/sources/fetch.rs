//! JSON-over-HTTP fetch adapter.
//!
//! One GET per call, no internal retries. Retry and backoff belong to whatever
//! schedules the pipeline. Failures are classified into `NetworkError` kinds.

use crate::error::NetworkError;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// Fetches one JSON document from a URL.
///
/// Extractors only see this trait, so tests and offline runs can serve canned
/// payloads.
pub trait JsonFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<Value, NetworkError>;
}

/// Headers for an optional bearer token.
pub fn bearer_headers(token: Option<&str>) -> Vec<(String, String)> {
    token
        .map(|t| vec![("Authorization".to_string(), format!("Bearer {t}"))])
        .unwrap_or_default()
}

/// Blocking reqwest-backed fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("fxetl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn classify(url: &str, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout {
                url: url.to_string(),
                source: e,
            }
        } else {
            NetworkError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

impl JsonFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<Value, NetworkError> {
        info!(url, "requesting feed");

        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let result = request
            .send()
            .map_err(|e| Self::classify(url, e))
            .and_then(|resp| {
                let status = resp.status();
                if !status.is_success() {
                    return Err(NetworkError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                resp.bytes().map_err(|e| Self::classify(url, e))
            })
            .and_then(|body| {
                serde_json::from_slice::<Value>(&body).map_err(|source| NetworkError::Decode {
                    url: url.to_string(),
                    source,
                })
            });

        match result {
            Ok(value) => {
                match record_count(&value) {
                    Some(records) => info!(url, records, "feed fetched"),
                    None => info!(url, "feed fetched"),
                }
                Ok(value)
            }
            Err(e) => {
                error!(url, error = %e, "feed request failed");
                Err(e)
            }
        }
    }
}

/// Number of elements in a payload: array length, or the size of a
/// `rates` / `data.rates` map.
pub fn record_count(value: &Value) -> Option<usize> {
    if let Some(items) = value.as_array() {
        return Some(items.len());
    }
    value
        .get("rates")
        .or_else(|| value.get("data").and_then(|d| d.get("rates")))
        .and_then(Value::as_object)
        .map(|rates| rates.len())
}
