//! Exchange-rate extractor.

use super::backfill::{collect_history, round_to, Jitter, SourceRequest};
use super::rate_entries;
use super::validate::validate_non_empty;
use crate::error::Result;
use crate::schema;
use polars::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

pub const SOURCE_NAME: &str = "Exchange Rates";

/// Rate noise applied per synthetic day.
const RATE_SPREAD: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub date: String,
    pub source_currency: String,
    pub target_currency: String,
    pub rate: f64,
}

fn parse_rates(payload: &Value) -> Vec<(String, f64)> {
    rate_entries(payload.get("rates").and_then(Value::as_object))
        .into_iter()
        .filter(|(code, rate)| {
            if *rate > 0.0 {
                true
            } else {
                warn!(code = code.as_str(), rate, "skipping non-positive rate");
                false
            }
        })
        .collect()
}

/// Convert rate rows into a DataFrame.
pub fn rates_to_frame(rows: &[RateRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            schema::DATE.into(),
            rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::SOURCE_CURRENCY.into(),
            rows.iter().map(|r| r.source_currency.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::TARGET_CURRENCY.into(),
            rows.iter().map(|r| r.target_currency.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::RATE.into(),
            rows.iter().map(|r| r.rate).collect::<Vec<_>>(),
        ),
    ])
}

/// Extract the exchange-rate Historical Record Set, quoted against `base_currency`.
pub fn extract_rates(request: &SourceRequest<'_>, base_currency: &str) -> Result<DataFrame> {
    info!(source = SOURCE_NAME, days = request.dias_historico, "extracting");

    let make_row = |quote: &(String, f64), date: &str, jitter: &mut Jitter| RateRow {
        date: date.to_string(),
        source_currency: base_currency.to_string(),
        target_currency: quote.0.clone(),
        rate: round_to(jitter.scale(quote.1, RATE_SPREAD), 6),
    };

    let rows = collect_history(request, "rates", parse_rates, make_row)?;
    let df = rates_to_frame(&rows)?;
    validate_non_empty(Some(&df), SOURCE_NAME)?;

    info!(source = SOURCE_NAME, records = df.height(), "extracted");
    Ok(df)
}
