//! Supplemental-data extractor: rating and volume per product.
//!
//! Only the first `cap` entities of the snapshot are kept, in payload order.

use super::backfill::{collect_history, round_to, Jitter, SourceRequest};
use super::rate_entries;
use super::validate::validate_non_empty;
use crate::error::Result;
use crate::schema;
use polars::prelude::*;
use serde_json::Value;
use tracing::info;

pub const SOURCE_NAME: &str = "Supplemental Data";

pub const RATINGS: [&str; 4] = ["A", "A+", "A-", "B+"];

/// Volume noise applied per synthetic day.
const VOLUME_SPREAD: f64 = 0.20;

#[derive(Debug, Clone, PartialEq)]
pub struct SupplementalRow {
    pub product_id: String,
    pub rating: String,
    pub volume: f64,
    pub date: String,
}

fn parse_supplemental(payload: &Value, cap: usize) -> Vec<(String, f64)> {
    let rates = payload
        .get("data")
        .and_then(|data| data.get("rates"))
        .and_then(Value::as_object);
    let mut entries = rate_entries(rates);
    entries.truncate(cap);
    entries
}

fn supplemental_row(quote: &(String, f64), date: &str, jitter: &mut Jitter) -> SupplementalRow {
    let (code, rate) = quote;
    let base_volume = round_to(rate * 1_000_000.0, 2);
    SupplementalRow {
        product_id: format!("CRYPTO_{code}"),
        rating: jitter.pick(&RATINGS[..], &RATINGS[0]).to_string(),
        volume: round_to(jitter.scale(base_volume, VOLUME_SPREAD), 2),
        date: date.to_string(),
    }
}

/// Convert supplemental rows into a DataFrame.
pub fn supplemental_to_frame(rows: &[SupplementalRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            schema::PRODUCT_ID.into(),
            rows.iter().map(|r| r.product_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::RATING.into(),
            rows.iter().map(|r| r.rating.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::VOLUME.into(),
            rows.iter().map(|r| r.volume).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::DATE.into(),
            rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
        ),
    ])
}

/// Extract the supplemental Historical Record Set.
pub fn extract_supplemental(request: &SourceRequest<'_>, cap: usize) -> Result<DataFrame> {
    info!(source = SOURCE_NAME, days = request.dias_historico, cap, "extracting");

    let parse = |payload: &Value| parse_supplemental(payload, cap);
    let rows = collect_history(request, "supplemental", parse, supplemental_row)?;
    let df = supplemental_to_frame(&rows)?;
    validate_non_empty(Some(&df), SOURCE_NAME)?;

    info!(source = SOURCE_NAME, records = df.height(), "extracted");
    Ok(df)
}
