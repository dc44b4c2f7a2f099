//! Store Module
//!
//! CSV-backed tables: the read-only text input table and the append-only
//! enrollment log.

mod input;
mod result_log;

pub use input::{InputStore, TextRecord};
pub use result_log::{ResultLog, TIMESTAMP_FORMAT, VoiceIdentity};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("bad timestamp '{value}' in {path}")]
    Timestamp { path: String, value: String },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}
