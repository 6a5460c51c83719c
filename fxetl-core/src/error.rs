//! Structured error types for every pipeline stage.
//!
//! Each stage has its own error type so the caller (usually an external
//! scheduler) can tell an extraction failure from a consolidation failure.
//! `EtlError` is the umbrella returned by extractors and the pipeline facade.

use polars::prelude::{DataType, PolarsError};
use thiserror::Error;

/// Failure of a single HTTP GET against a feed.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("timed out fetching {url}: {source}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl NetworkError {
    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            NetworkError::Timeout { url, .. }
            | NetworkError::HttpStatus { url, .. }
            | NetworkError::Transport { url, .. }
            | NetworkError::Decode { url, .. } => url,
        }
    }
}

/// A source produced no usable rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{name} is empty")]
pub struct EmptyResultError {
    pub name: String,
}

/// A join or derivation step could not proceed.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("type mismatch on join key '{column}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("no exchange rate for {currency} and fallback is disabled")]
    MissingRate { currency: String },

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),
}

/// Umbrella error for a pipeline run.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    #[error("empty result: {0}")]
    EmptyResult(#[from] EmptyResultError),

    #[error("consolidation: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("table construction failed: {0}")]
    Frame(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_names_the_source() {
        let err = EmptyResultError {
            name: "Products".into(),
        };
        assert_eq!(err.to_string(), "Products is empty");

        let wrapped: EtlError = err.into();
        assert!(matches!(wrapped, EtlError::EmptyResult(_)));
    }

    #[test]
    fn http_status_error_carries_url() {
        let err = NetworkError::HttpStatus {
            url: "https://example.test/feed".into(),
            status: 503,
        };
        assert_eq!(err.url(), "https://example.test/feed");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn missing_column_message() {
        let err = ConsolidationError::MissingColumn {
            table: "rates".into(),
            column: "target_currency".into(),
        };
        assert_eq!(
            err.to_string(),
            "table 'rates' is missing required column 'target_currency'"
        );
    }
}
