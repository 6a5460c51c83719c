//! Consolidation of the three cleaned record sets into one table.
//!
//! Products are the driving side of two left joins: first with the exchange
//! rate for the local currency on `date`, then with supplemental data on
//! `product_id`. Both right-hand tables are reduced to one row per key before
//! joining, so the output has exactly one row per cleaned product row, in the
//! original product order.

use super::clean::Cleaner;
use crate::error::ConsolidationError;
use crate::progress::{NoProgress, PipelineProgress, Stage};
use crate::schema::{self, has_column, require_columns, require_same_dtype};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CURRENT_VERSION: &str = "1.0";

/// Rate substituted when the local currency has no quote.
pub const FALLBACK_RATE: f64 = 1.0;

const ROW_INDEX: &str = "__row_index";

/// What to do when the rate table has no row for the local currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Substitute a rate of 1.0, warn, and flag the result as degraded.
    #[default]
    Lenient,

    /// Fail with `ConsolidationError::MissingRate`.
    Strict,
}

/// Consolidated table plus how it was produced.
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub table: DataFrame,
    /// True when the 1.0 fallback rate was used. Derived prices are suspect.
    pub used_fallback_rate: bool,
}

/// Joins, derives and orders the consolidated table.
pub struct Consolidator<'a> {
    local_currency: String,
    fallback: FallbackPolicy,
    progress: &'a dyn PipelineProgress,
}

impl<'a> Consolidator<'a> {
    pub fn new(
        local_currency: impl Into<String>,
        fallback: FallbackPolicy,
        progress: &'a dyn PipelineProgress,
    ) -> Self {
        Self {
            local_currency: local_currency.into(),
            fallback,
            progress,
        }
    }

    pub fn consolidate(
        &self,
        products: &DataFrame,
        rates: &DataFrame,
        supplemental: &DataFrame,
    ) -> Result<Consolidated, ConsolidationError> {
        info!(currency = self.local_currency.as_str(), "consolidating");

        self.progress.on_stage_start(Stage::Clean);
        let products = Cleaner::clean(products, "products")?;
        let rates = Cleaner::clean(rates, "rates")?;
        let mut supplemental = Cleaner::clean(supplemental, "supplemental")?;
        self.progress.on_stage_complete(Stage::Clean, products.height());

        let today = Local::now().format("%Y-%m-%d").to_string();
        let products = if has_column(&products, schema::DATE) {
            products
        } else {
            warn!("products carry no date column, stamping today");
            products
                .lazy()
                .with_column(lit(today.as_str()).alias(schema::DATE))
                .collect()?
        };
        require_columns(&products, "products", &[schema::PRODUCT_ID])?;

        self.progress.on_stage_start(Stage::MergeRates);
        let (local_rates, used_fallback_rate) = self.local_rates(&products, &rates)?;
        require_same_dtype(&products, &local_rates, schema::DATE)?;
        let merged = products
            .lazy()
            .with_row_index(ROW_INDEX, None)
            .join(
                local_rates.lazy(),
                [col(schema::DATE)],
                [col(schema::DATE)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;
        info!(rows = merged.height(), "merged products with rates");
        self.progress.on_stage_complete(Stage::MergeRates, merged.height());

        self.progress.on_stage_start(Stage::MergeSupplemental);
        require_columns(&supplemental, "supplemental", &[schema::PRODUCT_ID])?;
        require_same_dtype(&merged, &supplemental, schema::PRODUCT_ID)?;
        if has_column(&supplemental, schema::VOLUME) {
            supplemental.rename(schema::VOLUME, schema::VOLUMEN.into())?;
        }
        let per_product = supplemental
            .lazy()
            .unique_stable(Some(vec![schema::PRODUCT_ID.into()]), UniqueKeepStrategy::First);
        let merged = merged
            .lazy()
            .join(
                per_product,
                [col(schema::PRODUCT_ID)],
                [col(schema::PRODUCT_ID)],
                JoinArgs::new(JoinType::Left)
                    .with_suffix(Some(schema::SUPPLEMENTAL_SUFFIX.into())),
            )
            .sort([ROW_INDEX], SortMultipleOptions::default())
            .collect()?
            .drop(ROW_INDEX)?;
        info!(rows = merged.height(), "merged supplemental data");
        self.progress
            .on_stage_complete(Stage::MergeSupplemental, merged.height());

        self.progress.on_stage_start(Stage::Derive);
        let mut table = derive_local_price(merged, &self.local_currency)?;
        stamp_metadata(&mut table)?;
        let table = reorder_columns(&table)?;
        self.progress.on_stage_complete(Stage::Derive, table.height());

        info!(
            rows = table.height(),
            columns = table.width(),
            fallback = used_fallback_rate,
            "consolidation complete"
        );
        Ok(Consolidated {
            table,
            used_fallback_rate,
        })
    }

    /// Rates for the local currency, one row per date, with `rate` renamed
    /// to `tipo_cambio`. Falls back to 1.0 per product date when lenient.
    fn local_rates(
        &self,
        products: &DataFrame,
        rates: &DataFrame,
    ) -> Result<(DataFrame, bool), ConsolidationError> {
        require_columns(
            rates,
            "rates",
            &[schema::DATE, schema::TARGET_CURRENCY, schema::RATE],
        )?;

        let local = rates
            .clone()
            .lazy()
            .filter(col(schema::TARGET_CURRENCY).eq(lit(self.local_currency.as_str())))
            .select([col(schema::DATE), col(schema::RATE).alias(schema::TIPO_CAMBIO)])
            .unique_stable(Some(vec![schema::DATE.into()]), UniqueKeepStrategy::First)
            .collect()?;

        if local.height() > 0 {
            info!(
                currency = self.local_currency.as_str(),
                dates = local.height(),
                "local exchange rate found"
            );
            return Ok((local, false));
        }

        if self.fallback == FallbackPolicy::Strict {
            return Err(ConsolidationError::MissingRate {
                currency: self.local_currency.clone(),
            });
        }

        let reason = format!(
            "no exchange rate for {}, assuming USD->{} = {FALLBACK_RATE}",
            self.local_currency, self.local_currency
        );
        warn!(currency = self.local_currency.as_str(), "{reason}");
        self.progress.on_degraded(Stage::MergeRates, &reason);

        let fallback = products
            .clone()
            .lazy()
            .select([col(schema::DATE)])
            .unique_stable(None, UniqueKeepStrategy::First)
            .with_column(lit(FALLBACK_RATE).alias(schema::TIPO_CAMBIO))
            .collect()?;
        Ok((fallback, true))
    }
}

/// Consolidate with the lenient fallback and no progress reporting.
pub fn consolidate(
    products: &DataFrame,
    rates: &DataFrame,
    supplemental: &DataFrame,
    local_currency: &str,
) -> Result<DataFrame, ConsolidationError> {
    Consolidator::new(local_currency, FallbackPolicy::Lenient, &NoProgress)
        .consolidate(products, rates, supplemental)
        .map(|c| c.table)
}

/// Add `precio_local = round(price_usd * tipo_cambio, 2)` and `moneda_local`.
///
/// Passes the table through unchanged when either input column is missing.
pub fn derive_local_price(mut df: DataFrame, local_currency: &str) -> PolarsResult<DataFrame> {
    for required in [schema::PRICE_USD, schema::TIPO_CAMBIO] {
        if !has_column(&df, required) {
            warn!(column = required, "column missing, skipping local price");
            return Ok(df);
        }
    }

    let price = df.column(schema::PRICE_USD)?.cast(&DataType::Float64)?;
    let rate = df.column(schema::TIPO_CAMBIO)?.cast(&DataType::Float64)?;
    let local: Vec<Option<f64>> = price
        .f64()?
        .into_iter()
        .zip(rate.f64()?)
        .map(|(p, r)| match (p, r) {
            (Some(p), Some(r)) => Some(round_price(p * r)),
            _ => None,
        })
        .collect();

    let stats: Vec<f64> = local.iter().flatten().copied().collect();
    if !stats.is_empty() {
        let min = stats.iter().copied().fold(f64::INFINITY, f64::min);
        let max = stats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = stats.iter().sum::<f64>() / stats.len() as f64;
        info!(currency = local_currency, min, max, mean, "local prices derived");
    }

    let height = df.height();
    df.with_column(Column::new(schema::PRECIO_LOCAL.into(), local))?;
    df.with_column(Column::new(
        schema::MONEDA_LOCAL.into(),
        vec![local_currency; height],
    ))?;
    Ok(df)
}

/// Round a derived price to two decimals, ties to even.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Stamp the processing timestamp and pipeline version on every row.
fn stamp_metadata(df: &mut DataFrame) -> PolarsResult<()> {
    let height = df.height();
    let processed_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    df.with_column(Column::new(
        schema::FECHA_PROCESAMIENTO.into(),
        vec![processed_at.as_str(); height],
    ))?;
    df.with_column(Column::new(
        schema::PIPELINE_VERSION.into(),
        vec![CURRENT_VERSION; height],
    ))?;
    Ok(())
}

/// Preferred columns first, then the rest in their existing order.
pub fn reorder_columns(df: &DataFrame) -> PolarsResult<DataFrame> {
    let existing: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|c| c.to_string())
        .collect();
    let mut ordered: Vec<String> = schema::PREFERRED_ORDER
        .iter()
        .filter(|name| existing.iter().any(|c| c == *name))
        .map(|name| name.to_string())
        .collect();
    ordered.extend(
        existing
            .into_iter()
            .filter(|c| !schema::PREFERRED_ORDER.contains(&c.as_str())),
    );
    df.select(ordered)
}
