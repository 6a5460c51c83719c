//! Product extractor.
//!
//! The placeholder feed is a currency-rate snapshot: every quoted currency
//! becomes a "product" priced in USD at the inverse of its rate.

use super::backfill::{collect_history, round_to, Jitter, SourceRequest};
use super::rate_entries;
use super::validate::validate_non_empty;
use crate::error::Result;
use crate::schema;
use polars::prelude::*;
use serde_json::Value;
use tracing::info;

pub const SOURCE_NAME: &str = "Products";
pub const CATEGORY_FOREX: &str = "Forex";

/// Price noise applied per synthetic day.
const PRICE_SPREAD: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub product_id: String,
    pub name: String,
    pub price_usd: f64,
    pub category: String,
    pub date: String,
}

fn parse_products(payload: &Value) -> Vec<(String, f64)> {
    rate_entries(payload.get("rates").and_then(Value::as_object))
}

fn product_row(quote: &(String, f64), date: &str, jitter: &mut Jitter) -> ProductRow {
    let (code, rate) = quote;
    let base_price = if *rate > 0.0 {
        round_to(1.0 / rate, 4)
    } else {
        0.0
    };
    ProductRow {
        product_id: format!("CURR_{code}"),
        name: format!("Currency {code}"),
        price_usd: round_to(jitter.scale(base_price, PRICE_SPREAD), 4),
        category: CATEGORY_FOREX.to_string(),
        date: date.to_string(),
    }
}

/// Convert product rows into a DataFrame.
pub fn products_to_frame(rows: &[ProductRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            schema::PRODUCT_ID.into(),
            rows.iter().map(|r| r.product_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::NAME.into(),
            rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::PRICE_USD.into(),
            rows.iter().map(|r| r.price_usd).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::CATEGORY.into(),
            rows.iter().map(|r| r.category.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            schema::DATE.into(),
            rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
        ),
    ])
}

/// Extract the product Historical Record Set.
pub fn extract_products(request: &SourceRequest<'_>) -> Result<DataFrame> {
    info!(source = SOURCE_NAME, days = request.dias_historico, "extracting");

    let rows = collect_history(request, "products", parse_products, product_row)?;
    let df = products_to_frame(&rows)?;
    validate_non_empty(Some(&df), SOURCE_NAME)?;

    info!(source = SOURCE_NAME, records = df.height(), "extracted");
    Ok(df)
}
