//! Pipeline configuration.
//!
//! Stored as an optional TOML file; every field has a default so an empty
//! file (or no file at all) yields a runnable configuration.

use crate::sources::backfill::Backfill;
use crate::transform::consolidate::FallbackPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PRODUCTS_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";
pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";
pub const DEFAULT_SUPPLEMENTAL_URL: &str =
    "https://api.coinbase.com/v2/exchange-rates?currency=USD";

/// Errors from loading configuration or resolving the warehouse target.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing environment variables: {0}")]
    MissingVars(String),

    #[error("invalid value for {name}: '{value}'")]
    InvalidVar { name: String, value: String },
}

/// Feed endpoints, one per source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub products: String,
    pub rates: String,
    pub supplemental: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            products: DEFAULT_PRODUCTS_URL.into(),
            rates: DEFAULT_RATES_URL.into(),
            supplemental: DEFAULT_SUPPLEMENTAL_URL.into(),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub endpoints: Endpoints,

    /// Sent as a bearer token on every feed request when present.
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Number of calendar days each extractor produces.
    pub dias_historico: u32,

    /// Currency the consolidated prices are converted into.
    pub local_currency: String,

    /// Source currency written into rate rows.
    pub base_currency: String,

    /// How many supplemental entities are kept from the snapshot.
    pub supplemental_cap: usize,

    pub backfill: Backfill,

    pub fallback: FallbackPolicy,

    /// Run the three extractors concurrently.
    pub parallel_extract: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            api_token: None,
            timeout_secs: 30,
            dias_historico: 7,
            local_currency: "ARS".into(),
            base_currency: "USD".into(),
            supplemental_cap: 10,
            backfill: Backfill::default(),
            fallback: FallbackPolicy::default(),
            parallel_extract: false,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
