//! Loader collaborator: warehouse target selection and staging sinks.

pub mod staging;
pub mod target;

pub use staging::{load_staging, LoadError, ParquetStagingSink, StagingSink, CHUNK_ROWS};
pub use target::{ConnectionProfile, WarehouseTarget, STAGING_TABLE};
