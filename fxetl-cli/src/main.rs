//! FX ETL CLI: run the pipeline and inspect the warehouse target.
//!
//! Commands:
//! - `run`: extract, consolidate and summarize; optionally stage the table
//! - `target`: print the resolved warehouse target (password redacted)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fxetl_core::load::{load_staging, ParquetStagingSink, WarehouseTarget, CHUNK_ROWS};
use fxetl_core::sources::{Backfill, HttpFetcher};
use fxetl_core::{Pipeline, PipelineConfig, TracingProgress};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "fxetl",
    about = "FX ETL CLI: currency feed extraction and consolidation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and print the summary as JSON.
    Run {
        /// Calendar days of history per source. Overrides the config file.
        #[arg(long)]
        days: Option<u32>,

        /// Local currency code (e.g. ARS). Overrides the config file.
        #[arg(long)]
        currency: Option<String>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stage the consolidated table as Parquet parts in this directory.
        #[arg(long)]
        stage_dir: Option<PathBuf>,

        /// Seed for reproducible jittered backfill.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the warehouse target resolved from the environment.
    Target,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            days,
            currency,
            config,
            stage_dir,
            seed,
        } => run_pipeline(days, currency, config, stage_dir, seed),
        Commands::Target => print_target(),
    }
}

fn run_pipeline(
    days: Option<u32>,
    currency: Option<String>,
    config_path: Option<PathBuf>,
    stage_dir: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(currency) = currency {
        config.local_currency = currency.to_ascii_uppercase();
    }
    if let Some(seed) = seed {
        match &mut config.backfill {
            Backfill::Jittered { seed: s } => *s = Some(seed),
            other => bail!("--seed only applies to jittered backfill, config uses {other:?}"),
        }
    }
    let days = days.unwrap_or(config.dias_historico);

    let fetcher = HttpFetcher::new().context("failed to build HTTP client")?;
    let pipeline =
        Pipeline::new(config, Arc::new(fetcher)).with_progress(Arc::new(TracingProgress));
    let output = pipeline.run(days)?;

    if output.degraded {
        warn!(
            currency = pipeline.config().local_currency.as_str(),
            "no exchange rate for the local currency; precio_local was derived with rate 1.0"
        );
    }

    if let Some(dir) = stage_dir {
        let mut sink = ParquetStagingSink::open(&dir)
            .with_context(|| format!("failed to open staging dir {}", dir.display()))?;
        let staged = load_staging(&mut sink, &output.table, CHUNK_ROWS)?;
        info!(rows = staged, dir = %dir.display(), "staged consolidated table");
    }

    println!("{}", serde_json::to_string_pretty(&output.summary)?);
    Ok(())
}

fn print_target() -> Result<()> {
    let target = WarehouseTarget::from_env()?;
    println!("target:        {target}");
    println!("staging table: {}", target.staging_table());
    Ok(())
}
