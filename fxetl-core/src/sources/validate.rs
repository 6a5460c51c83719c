//! Empty-result guard applied to every extracted record set.

use crate::error::EmptyResultError;
use polars::prelude::DataFrame;
use tracing::{error, info};

/// Reject an absent or zero-row table.
pub fn validate_non_empty(table: Option<&DataFrame>, name: &str) -> Result<(), EmptyResultError> {
    match table {
        Some(df) if df.height() > 0 => {
            info!(
                source = name,
                rows = df.height(),
                columns = df.width(),
                "record set valid"
            );
            Ok(())
        }
        _ => {
            error!(source = name, "record set is empty");
            Err(EmptyResultError {
                name: name.to_string(),
            })
        }
    }
}
