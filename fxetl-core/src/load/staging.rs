//! Staging sinks for the consolidated table.
//!
//! The loader truncates the staging destination and bulk-appends the table in
//! fixed-size chunks. Dimensional modeling over the staged rows happens
//! downstream and is not part of this crate.

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Rows per appended chunk.
pub const CHUNK_ROWS: usize = 1000;

const PART_PREFIX: &str = "part-";
const PART_SUFFIX: &str = ".parquet";
const TMP_SUFFIX: &str = ".parquet.tmp";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("refusing to stage an empty table")]
    EmptyTable,

    #[error("staging I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error: {0}")]
    Parquet(#[from] PolarsError),
}

/// A truncate-and-append staging destination.
pub trait StagingSink {
    /// Remove every previously staged row.
    fn truncate(&mut self) -> Result<(), LoadError>;

    /// Append one chunk of rows.
    fn append(&mut self, chunk: &DataFrame) -> Result<(), LoadError>;
}

/// Truncate the sink, then append `table` in chunks of `chunk_rows`.
///
/// Returns the number of rows staged.
pub fn load_staging(
    sink: &mut dyn StagingSink,
    table: &DataFrame,
    chunk_rows: usize,
) -> Result<usize, LoadError> {
    if table.height() == 0 {
        return Err(LoadError::EmptyTable);
    }
    let chunk_rows = chunk_rows.max(1);

    sink.truncate()?;
    let mut offset = 0;
    while offset < table.height() {
        let chunk = table.slice(offset as i64, chunk_rows);
        sink.append(&chunk)?;
        offset += chunk.height();
    }

    info!(rows = table.height(), chunk_rows, "staging load complete");
    Ok(table.height())
}

/// Local-development sink: a directory of `part-NNNNN.parquet` files.
pub struct ParquetStagingSink {
    dir: PathBuf,
    next_part: usize,
}

impl ParquetStagingSink {
    /// Open (creating if needed) a staging directory. Appends continue after
    /// any parts already present.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| LoadError::Io {
            path: dir.clone(),
            source,
        })?;
        let next_part = part_files(&dir)?.len();
        Ok(Self { dir, next_part })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every staged part back as one table, in append order.
    pub fn read_all(&self) -> Result<DataFrame, LoadError> {
        let mut combined: Option<DataFrame> = None;
        for path in part_files(&self.dir)? {
            let file = fs::File::open(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let part = ParquetReader::new(file).finish()?;
            match combined.as_mut() {
                Some(df) => {
                    df.vstack_mut(&part)?;
                }
                None => combined = Some(part),
            }
        }
        Ok(combined.unwrap_or_default())
    }

    fn part_path(&self, index: usize, suffix: &str) -> PathBuf {
        self.dir.join(format!("{PART_PREFIX}{index:05}{suffix}"))
    }
}

impl StagingSink for ParquetStagingSink {
    fn truncate(&mut self) -> Result<(), LoadError> {
        // Leftover temporaries from an interrupted append go too.
        let mut parts = part_files(&self.dir)?;
        parts.extend(staged_files(&self.dir, TMP_SUFFIX)?);
        for path in &parts {
            fs::remove_file(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
        }
        self.next_part = 0;
        info!(dir = %self.dir.display(), removed = parts.len(), "staging truncated");
        Ok(())
    }

    fn append(&mut self, chunk: &DataFrame) -> Result<(), LoadError> {
        let path = self.part_path(self.next_part, PART_SUFFIX);
        let tmp_path = self.part_path(self.next_part, TMP_SUFFIX);

        let file = fs::File::create(&tmp_path).map_err(|source| LoadError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        ParquetWriter::new(file).finish(&mut chunk.clone())?;

        fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            LoadError::Io {
                path: path.clone(),
                source,
            }
        })?;

        self.next_part += 1;
        info!(path = %path.display(), rows = chunk.height(), "staged chunk");
        Ok(())
    }
}

/// Staged part files in the directory, sorted by name.
fn part_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    staged_files(dir, PART_SUFFIX)
}

/// Files named `part-*<suffix>`, sorted by name.
fn staged_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut parts = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_part = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(PART_PREFIX) && n.ends_with(suffix));
        if is_part {
            parts.push(path);
        }
    }
    parts.sort();
    Ok(parts)
}
