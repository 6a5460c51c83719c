//! Record-set cleaning: dedupe, drop empty rows, fill missing values.

use crate::schema::is_numeric_dtype;
use polars::prelude::*;
use tracing::info;

/// Sentinel for missing text values.
pub const MISSING_TEXT: &str = "N/A";

/// Cleaner for any tabular record set.
pub struct Cleaner;

impl Cleaner {
    /// Remove exact duplicate rows, keeping the first occurrence in order.
    pub fn dedupe(df: LazyFrame) -> LazyFrame {
        df.unique_stable(None, UniqueKeepStrategy::First)
    }

    /// Drop rows where every column is null.
    pub fn drop_empty_rows(df: LazyFrame, columns: &[String]) -> LazyFrame {
        let any_present = columns
            .iter()
            .map(|name| col(name.as_str()).is_not_null())
            .reduce(|acc, e| acc.or(e));
        match any_present {
            Some(predicate) => df.filter(predicate),
            None => df,
        }
    }

    /// Fill nulls: numeric columns with zero, text columns with `N/A`.
    pub fn fill_missing(df: LazyFrame, schema: &Schema) -> LazyFrame {
        let fills: Vec<Expr> = schema
            .iter()
            .filter_map(|(name, dtype)| {
                if is_numeric_dtype(dtype) {
                    Some(col(name.as_str()).fill_null(lit(0).cast(dtype.clone())))
                } else if *dtype == DataType::String {
                    Some(col(name.as_str()).fill_null(lit(MISSING_TEXT)))
                } else {
                    None
                }
            })
            .collect();
        if fills.is_empty() {
            df
        } else {
            df.with_columns(fills)
        }
    }

    /// Full cleaning pass.
    ///
    /// Filling can turn two distinct rows into duplicates, so the dedupe runs
    /// again at the end. That makes `clean(clean(t)) == clean(t)`.
    pub fn clean(df: &DataFrame, name: &str) -> PolarsResult<DataFrame> {
        let rows_before = df.height();
        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        let schema = df.schema().clone();

        let deduped = Self::dedupe(df.clone().lazy());
        let non_empty = Self::drop_empty_rows(deduped, &columns);
        let filled = Self::fill_missing(non_empty, &schema);
        let cleaned = Self::dedupe(filled).collect()?;

        info!(
            source = name,
            rows_before,
            rows_after = cleaned.height(),
            removed = rows_before - cleaned.height(),
            "cleaned"
        );
        Ok(cleaned)
    }
}
