//! Pipeline facade: extract ×3, consolidate, summarize.
//!
//! Any component failure propagates unchanged. A run returns the complete
//! table and summary or an error, never a partial result.

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::progress::{PipelineProgress, Stage, TracingProgress};
use crate::sources::{
    bearer_headers, extract_products, extract_rates, extract_supplemental, JsonFetcher,
    SourceRequest,
};
use crate::transform::{summarize, Consolidator, Summary};
use chrono::{Local, NaiveDate};
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Row counts of the three extracted record sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionCounts {
    pub products: usize,
    pub rates: usize,
    pub supplemental: usize,
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: DataFrame,
    pub summary: Summary,
    /// The local currency had no rate and 1.0 was substituted.
    pub degraded: bool,
    pub extracted: ExtractionCounts,
}

struct Extracted {
    products: DataFrame,
    rates: DataFrame,
    supplemental: DataFrame,
}

/// Runs the ETL core against a fetcher.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn JsonFetcher>,
    progress: Arc<dyn PipelineProgress>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            config,
            fetcher,
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn PipelineProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run anchored on today's local date.
    pub fn run(&self, dias_historico: u32) -> Result<PipelineOutput> {
        self.run_as_of(dias_historico, Local::now().date_naive())
    }

    /// Run with an explicit "today" anchor for the history dates.
    pub fn run_as_of(&self, dias_historico: u32, today: NaiveDate) -> Result<PipelineOutput> {
        if dias_historico == 0 {
            return Err(EtlError::InvalidArgument(
                "dias_historico must be a positive integer".into(),
            ));
        }
        info!(
            days = dias_historico,
            currency = self.config.local_currency.as_str(),
            "pipeline started"
        );

        let extracted = self.extract_all(dias_historico, today)?;
        let counts = ExtractionCounts {
            products: extracted.products.height(),
            rates: extracted.rates.height(),
            supplemental: extracted.supplemental.height(),
        };

        let consolidator = Consolidator::new(
            self.config.local_currency.as_str(),
            self.config.fallback,
            self.progress.as_ref(),
        );
        let consolidated = consolidator
            .consolidate(&extracted.products, &extracted.rates, &extracted.supplemental)
            .map_err(|e| {
                error!(error = %e, "consolidation failed");
                e
            })?;

        self.progress.on_stage_start(Stage::Summarize);
        let summary = summarize(&consolidated.table)?;
        self.progress
            .on_stage_complete(Stage::Summarize, consolidated.table.height());

        if consolidated.used_fallback_rate {
            warn!(
                currency = self.config.local_currency.as_str(),
                "pipeline finished in degraded mode"
            );
        }
        info!(
            rows = consolidated.table.height(),
            degraded = consolidated.used_fallback_rate,
            "pipeline finished"
        );

        Ok(PipelineOutput {
            table: consolidated.table,
            summary,
            degraded: consolidated.used_fallback_rate,
            extracted: counts,
        })
    }

    fn extract_all(&self, dias_historico: u32, today: NaiveDate) -> Result<Extracted> {
        let headers = bearer_headers(self.config.api_token.as_deref());
        let endpoints = &self.config.endpoints;

        let products = || {
            self.stage(Stage::ExtractProducts, || {
                let request = self.request(&endpoints.products, &headers, dias_historico, today);
                extract_products(&request)
            })
        };
        let rates = || {
            self.stage(Stage::ExtractRates, || {
                let request = self.request(&endpoints.rates, &headers, dias_historico, today);
                extract_rates(&request, &self.config.base_currency)
            })
        };
        let supplemental = || {
            self.stage(Stage::ExtractSupplemental, || {
                let request =
                    self.request(&endpoints.supplemental, &headers, dias_historico, today);
                extract_supplemental(&request, self.config.supplemental_cap)
            })
        };

        if self.config.parallel_extract {
            let (products, (rates, supplemental)) =
                rayon::join(products, || rayon::join(rates, supplemental));
            Ok(Extracted {
                products: products?,
                rates: rates?,
                supplemental: supplemental?,
            })
        } else {
            Ok(Extracted {
                products: products()?,
                rates: rates()?,
                supplemental: supplemental()?,
            })
        }
    }

    fn request<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        dias_historico: u32,
        today: NaiveDate,
    ) -> SourceRequest<'a> {
        SourceRequest {
            fetcher: self.fetcher.as_ref(),
            url,
            headers,
            timeout: self.config.timeout(),
            dias_historico,
            backfill: &self.config.backfill,
            today,
        }
    }

    fn stage(
        &self,
        stage: Stage,
        extract: impl FnOnce() -> Result<DataFrame>,
    ) -> Result<DataFrame> {
        self.progress.on_stage_start(stage);
        match extract() {
            Ok(df) => {
                self.progress.on_stage_complete(stage, df.height());
                Ok(df)
            }
            Err(e) => {
                error!(stage = stage.as_str(), error = %e, "stage failed");
                Err(e)
            }
        }
    }
}
