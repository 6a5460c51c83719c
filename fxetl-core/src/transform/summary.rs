//! Aggregate statistics over the consolidated table.

use crate::schema;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Min/max/mean/median of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "promedio")]
    pub mean: f64,
    #[serde(rename = "mediana")]
    pub median: f64,
}

impl PriceStats {
    /// Stats over the non-null values, or `None` when there are none.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
        Some(Self {
            min: values[0],
            max: values[n - 1],
            mean: values.iter().sum::<f64>() / n as f64,
            median,
        })
    }
}

/// Snapshot of one consolidated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "total_registros")]
    pub total_rows: usize,

    #[serde(rename = "total_columnas")]
    pub total_columns: usize,

    #[serde(rename = "columnas")]
    pub columns: Vec<String>,

    #[serde(rename = "fecha_procesamiento")]
    pub processed_at: String,

    #[serde(rename = "precio_usd", default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<PriceStats>,

    #[serde(rename = "precio_local", default, skip_serializing_if = "Option::is_none")]
    pub precio_local: Option<PriceStats>,

    #[serde(rename = "por_categoria", default, skip_serializing_if = "Option::is_none")]
    pub by_category: Option<BTreeMap<String, usize>>,
}

fn column_stats(df: &DataFrame, column: &str) -> PolarsResult<Option<PriceStats>> {
    if !schema::has_column(df, column) {
        return Ok(None);
    }
    let values = df.column(column)?.cast(&DataType::Float64)?;
    let values: Vec<f64> = values.f64()?.into_iter().flatten().collect();
    Ok(PriceStats::from_values(values))
}

fn category_counts(df: &DataFrame) -> PolarsResult<Option<BTreeMap<String, usize>>> {
    if !schema::has_column(df, schema::CATEGORY) {
        return Ok(None);
    }
    let categories = df.column(schema::CATEGORY)?.cast(&DataType::String)?;
    let mut counts = BTreeMap::new();
    for category in categories.str()?.into_iter().flatten() {
        *counts.entry(category.to_string()).or_insert(0) += 1;
    }
    Ok(Some(counts))
}

/// Summarize a consolidated table.
///
/// Price blocks appear only when their column exists and has values; the
/// category mapping only when `category` exists.
pub fn summarize(df: &DataFrame) -> PolarsResult<Summary> {
    let summary = Summary {
        total_rows: df.height(),
        total_columns: df.width(),
        columns: df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect(),
        processed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        price_usd: column_stats(df, schema::PRICE_USD)?,
        precio_local: column_stats(df, schema::PRECIO_LOCAL)?,
        by_category: category_counts(df)?,
    };

    info!(
        rows = summary.total_rows,
        columns = summary.total_columns,
        "summary generated"
    );
    Ok(summary)
}
