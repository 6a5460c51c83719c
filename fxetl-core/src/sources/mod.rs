//! Source extractors and their shared plumbing.
//!
//! Each extractor turns one JSON feed into a Historical Record Set: one row
//! per base entity per calendar day, validated non-empty.

pub mod backfill;
pub mod fetch;
pub mod products;
pub mod rates;
pub mod supplemental;
pub mod validate;

pub use backfill::{history_dates, Backfill, Jitter, SourceRequest};
pub use fetch::{bearer_headers, HttpFetcher, JsonFetcher};
pub use products::{extract_products, ProductRow};
pub use rates::{extract_rates, RateRow};
pub use supplemental::{extract_supplemental, SupplementalRow};
pub use validate::validate_non_empty;

use serde_json::{Map, Value};
use tracing::warn;

/// `(code, value)` pairs from a rates map, in payload order.
///
/// Values may be JSON numbers or numeric strings; anything else is skipped.
pub(crate) fn rate_entries(rates: Option<&Map<String, Value>>) -> Vec<(String, f64)> {
    let Some(rates) = rates else {
        return Vec::new();
    };
    rates
        .iter()
        .filter_map(|(code, value)| {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            if parsed.is_none() {
                warn!(code = code.as_str(), value = %value, "skipping non-numeric rate");
            }
            parsed.map(|v| (code.clone(), v))
        })
        .collect()
}
