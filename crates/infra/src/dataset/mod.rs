//! Dataset sources: where training snapshots come from.
//!
//! The upstream merge job deposits the dataset; this layer only reads it.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use meteocast_core::{DatasetSnapshot, Observation};

pub mod file;
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use file::{FileDatasetSource, FileFormat};
pub use in_memory::InMemoryDatasetSource;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDatasetSource;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Supplies one immutable snapshot of the merged dataset per call.
///
/// Implementations may block (file or database IO); callers run them off the
/// request path.
pub trait DatasetSource: Send + Sync + 'static {
    fn get(&self) -> Result<DatasetSnapshot, DatasetError>;

    /// Short description for logs (path, table, ...).
    fn describe(&self) -> String;
}

impl<S> DatasetSource for Arc<S>
where
    S: DatasetSource + ?Sized,
{
    fn get(&self) -> Result<DatasetSnapshot, DatasetError> {
        (**self).get()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Row shape shared by file-backed sources; missing readings are allowed and dropped.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRow {
    #[serde(default, alias = "datetime")]
    timestamp: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
}

impl RawRow {
    pub(crate) fn into_observation(self) -> Option<Observation> {
        let observation = Observation::new(self.temperature?, self.humidity?);
        Some(match self.timestamp {
            Some(ts) => observation.with_timestamp(ts),
            None => observation,
        })
    }
}
