//! Column contract shared by the extractors and the consolidator.
//!
//! Calendar days are `String` columns in `%Y-%m-%d` form so that every source
//! joins on the same key type. Prices, rates and volumes are `Float64`.

use crate::error::ConsolidationError;
use polars::prelude::*;

// Source columns
pub const PRODUCT_ID: &str = "product_id";
pub const NAME: &str = "name";
pub const PRICE_USD: &str = "price_usd";
pub const CATEGORY: &str = "category";
pub const DATE: &str = "date";
pub const SOURCE_CURRENCY: &str = "source_currency";
pub const TARGET_CURRENCY: &str = "target_currency";
pub const RATE: &str = "rate";
pub const RATING: &str = "rating";
pub const VOLUME: &str = "volume";

// Consolidated columns
pub const TIPO_CAMBIO: &str = "tipo_cambio";
pub const PRECIO_LOCAL: &str = "precio_local";
pub const MONEDA_LOCAL: &str = "moneda_local";
pub const FECHA_PROCESAMIENTO: &str = "fecha_procesamiento";
pub const PIPELINE_VERSION: &str = "pipeline_version";
/// Supplemental `volume` as named in the consolidated table.
pub const VOLUMEN: &str = "volumen";

/// Suffix applied to supplemental columns that collide with consolidated ones.
pub const SUPPLEMENTAL_SUFFIX: &str = "_adicional";

/// Leading column order of the consolidated table.
pub const PREFERRED_ORDER: &[&str] = &[
    PRODUCT_ID,
    NAME,
    CATEGORY,
    PRICE_USD,
    TIPO_CAMBIO,
    PRECIO_LOCAL,
    MONEDA_LOCAL,
    DATE,
    FECHA_PROCESAMIENTO,
];

/// Schema of the product record set.
pub fn product_schema() -> Schema {
    Schema::from_iter(vec![
        Field::new(PRODUCT_ID.into(), DataType::String),
        Field::new(NAME.into(), DataType::String),
        Field::new(PRICE_USD.into(), DataType::Float64),
        Field::new(CATEGORY.into(), DataType::String),
        Field::new(DATE.into(), DataType::String),
    ])
}

/// Schema of the exchange-rate record set.
pub fn rate_schema() -> Schema {
    Schema::from_iter(vec![
        Field::new(DATE.into(), DataType::String),
        Field::new(SOURCE_CURRENCY.into(), DataType::String),
        Field::new(TARGET_CURRENCY.into(), DataType::String),
        Field::new(RATE.into(), DataType::Float64),
    ])
}

/// Schema of the supplemental record set.
pub fn supplemental_schema() -> Schema {
    Schema::from_iter(vec![
        Field::new(PRODUCT_ID.into(), DataType::String),
        Field::new(RATING.into(), DataType::String),
        Field::new(VOLUME.into(), DataType::Float64),
        Field::new(DATE.into(), DataType::String),
    ])
}

pub fn has_column(df: &DataFrame, column: &str) -> bool {
    df.schema().contains(column)
}

/// Fail with `MissingColumn` unless every column is present.
pub fn require_columns(
    df: &DataFrame,
    table: &str,
    columns: &[&str],
) -> Result<(), ConsolidationError> {
    for column in columns {
        if !has_column(df, column) {
            return Err(ConsolidationError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Fail with `TypeMismatch` unless `column` has the same dtype on both sides of a join.
pub fn require_same_dtype(
    left: &DataFrame,
    right: &DataFrame,
    column: &str,
) -> Result<(), ConsolidationError> {
    let left_dtype = left.column(column)?.dtype().clone();
    let right_dtype = right.column(column)?.dtype().clone();
    if left_dtype != right_dtype {
        return Err(ConsolidationError::TypeMismatch {
            column: column.to_string(),
            expected: left_dtype,
            actual: right_dtype,
        });
    }
    Ok(())
}

/// Whether a dtype is filled with zero by the cleaner.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
