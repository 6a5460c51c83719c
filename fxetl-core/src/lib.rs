//! FX ETL Core: extract, clean, consolidate and summarize currency feeds.
//!
//! This crate contains the data path of the pipeline:
//! - JSON fetch adapter with classified network errors
//! - Three source extractors with pluggable history backfill
//! - Cleaner and consolidator with explicit join-key contracts
//! - Local-currency price derivation and summary statistics
//! - Pipeline facade plus the staging-loader contract
//!
//! Logging configuration is left to the binary; components only emit
//! `tracing` events and report stage boundaries through `PipelineProgress`.

pub mod config;
pub mod error;
pub mod load;
pub mod pipeline;
pub mod progress;
pub mod rng;
pub mod schema;
pub mod sources;
pub mod transform;

pub use config::{ConfigError, PipelineConfig};
pub use error::{ConsolidationError, EmptyResultError, EtlError, NetworkError, Result};
pub use pipeline::{ExtractionCounts, Pipeline, PipelineOutput};
pub use progress::{NoProgress, PipelineProgress, Stage, TracingProgress};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types can cross thread boundaries.
    ///
    /// `parallel_extract` runs the extractors on rayon workers, so everything
    /// they touch must be Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Pipeline>();
        require_sync::<Pipeline>();
        require_send::<PipelineConfig>();
        require_sync::<PipelineConfig>();
        require_send::<sources::HttpFetcher>();
        require_sync::<sources::HttpFetcher>();
        require_send::<sources::Backfill>();
        require_sync::<sources::Backfill>();
        require_send::<transform::Summary>();
        require_sync::<transform::Summary>();
        require_send::<load::WarehouseTarget>();
        require_sync::<load::WarehouseTarget>();

        require_send::<EtlError>();
        require_sync::<EtlError>();
        require_send::<rng::SeedHierarchy>();
        require_sync::<rng::SeedHierarchy>();
    }

    /// Extractors only see the fetcher trait, never a concrete client.
    #[test]
    fn extractors_accept_any_fetcher() {
        fn _check_trait_object_builds(
            fetcher: &dyn sources::JsonFetcher,
            backfill: &sources::Backfill,
        ) -> Result<polars::prelude::DataFrame> {
            let request = sources::SourceRequest {
                fetcher,
                url: "https://feed.test/latest",
                headers: &[],
                timeout: std::time::Duration::from_secs(1),
                dias_historico: 1,
                backfill,
                today: chrono::NaiveDate::MIN,
            };
            sources::extract_products(&request)
        }
    }
}
