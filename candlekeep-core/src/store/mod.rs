//! On-disk persistence of finalized day sequences.

pub mod csv_store;

pub use csv_store::{ensure_dir, format_candle_time, CsvStore, SPOT_MARKET};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed file {path}: {message}")]
    Format { path: PathBuf, message: String },
}

impl StoreError {
    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}
