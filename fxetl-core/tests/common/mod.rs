//! Shared helpers for integration tests: canned feeds and recorders.

#![allow(dead_code)]

use fxetl_core::config::{Endpoints, PipelineConfig};
use fxetl_core::error::NetworkError;
use fxetl_core::progress::{PipelineProgress, Stage};
use fxetl_core::sources::{Backfill, JsonFetcher, SourceRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const PRODUCTS_URL: &str = "https://products.test/v4/latest/USD";
pub const RATES_URL: &str = "https://rates.test/v4/latest/USD";
pub const SUPPLEMENTAL_URL: &str = "https://supplemental.test/v2/exchange-rates";

/// Number of currencies in `latest_usd.json`.
pub const FIXTURE_CURRENCIES: usize = 6;

pub fn latest_usd() -> Value {
    serde_json::from_str(include_str!("../fixtures/latest_usd.json")).unwrap()
}

pub fn coinbase_usd() -> Value {
    serde_json::from_str(include_str!("../fixtures/coinbase_usd.json")).unwrap()
}

pub fn today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// One canned response.
enum Canned {
    Json(Value),
    Status(u16),
}

/// Serves canned payloads by URL and records every request.
///
/// Unknown URLs answer HTTP 404.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, Canned>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three default feeds answer with the fixtures.
    pub fn with_fixtures() -> Self {
        Self::new()
            .with_json(PRODUCTS_URL, latest_usd())
            .with_json(RATES_URL, latest_usd())
            .with_json(SUPPLEMENTAL_URL, coinbase_usd())
    }

    pub fn with_json(mut self, url: &str, payload: Value) -> Self {
        self.responses.insert(url.to_string(), Canned::Json(payload));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Canned::Status(status));
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn headers_sent(&self) -> Vec<Vec<(String, String)>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, headers)| headers.clone())
            .collect()
    }
}

impl JsonFetcher for StubFetcher {
    fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        _timeout: Duration,
    ) -> Result<Value, NetworkError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.to_vec()));
        match self.responses.get(url) {
            Some(Canned::Json(payload)) => Ok(payload.clone()),
            Some(Canned::Status(status)) => Err(NetworkError::HttpStatus {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(NetworkError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Records every progress callback as a readable line.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn degraded_stages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with("degraded"))
            .collect()
    }
}

impl PipelineProgress for RecordingProgress {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage}"));
    }

    fn on_stage_complete(&self, stage: Stage, rows: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {stage} {rows}"));
    }

    fn on_degraded(&self, stage: Stage, reason: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("degraded {stage}: {reason}"));
    }
}

/// Config pointing at the stub URLs with seeded jitter.
pub fn stub_config() -> PipelineConfig {
    PipelineConfig {
        endpoints: Endpoints {
            products: PRODUCTS_URL.into(),
            rates: RATES_URL.into(),
            supplemental: SUPPLEMENTAL_URL.into(),
        },
        backfill: Backfill::Jittered { seed: Some(42) },
        ..PipelineConfig::default()
    }
}

/// Request against `url` anchored on `today()`.
pub fn request<'a>(
    fetcher: &'a dyn JsonFetcher,
    url: &'a str,
    days: u32,
    backfill: &'a Backfill,
) -> SourceRequest<'a> {
    SourceRequest {
        fetcher,
        url,
        headers: &[],
        timeout: Duration::from_secs(5),
        dias_historico: days,
        backfill,
        today: today(),
    }
}

/// Distinct string values of a column, sorted.
pub fn distinct_strings(df: &polars::prelude::DataFrame, column: &str) -> Vec<String> {
    let mut values: Vec<String> = df
        .column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect();
    values.sort();
    values.dedup();
    values
}
