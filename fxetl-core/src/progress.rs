//! Stage-boundary reporting.
//!
//! The pipeline never configures logging itself. The process entry point
//! picks a `PipelineProgress` implementation and hands it in.

use tracing::{info, warn};

/// Named boundaries of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ExtractProducts,
    ExtractRates,
    ExtractSupplemental,
    Clean,
    MergeRates,
    MergeSupplemental,
    Derive,
    Summarize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ExtractProducts => "extract_products",
            Stage::ExtractRates => "extract_rates",
            Stage::ExtractSupplemental => "extract_supplemental",
            Stage::Clean => "clean",
            Stage::MergeRates => "merge_rates",
            Stage::MergeSupplemental => "merge_supplemental",
            Stage::Derive => "derive",
            Stage::Summarize => "summarize",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for stage boundaries.
pub trait PipelineProgress: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage);

    /// Called when a stage finishes with the number of rows it produced.
    fn on_stage_complete(&self, stage: Stage, rows: usize);

    /// Called when a stage falls back to a degraded default instead of failing.
    fn on_degraded(&self, stage: Stage, reason: &str);
}

/// Forwards stage boundaries to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl PipelineProgress for TracingProgress {
    fn on_stage_start(&self, stage: Stage) {
        info!(stage = stage.as_str(), "stage started");
    }

    fn on_stage_complete(&self, stage: Stage, rows: usize) {
        info!(stage = stage.as_str(), rows, "stage complete");
    }

    fn on_degraded(&self, stage: Stage, reason: &str) {
        warn!(stage = stage.as_str(), reason, "degraded mode");
    }
}

/// Discards all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_stage_start(&self, _stage: Stage) {}

    fn on_stage_complete(&self, _stage: Stage, _rows: usize) {}

    fn on_degraded(&self, _stage: Stage, _reason: &str) {}
}
