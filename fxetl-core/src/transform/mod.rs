//! Cleaning, consolidation and summary of extracted record sets.

pub mod clean;
pub mod consolidate;
pub mod summary;

pub use clean::{Cleaner, MISSING_TEXT};
pub use consolidate::{
    consolidate, derive_local_price, Consolidated, Consolidator, FallbackPolicy, FALLBACK_RATE,
};
pub use summary::{summarize, PriceStats, Summary};
