//! Infrastructure layer: dataset sources, the model cache and retraining.

pub mod cache;
pub mod dataset;
pub mod retrain;

pub use cache::{CacheError, ModelCache, ModelPair, Readiness};
pub use dataset::{DatasetError, DatasetSource, FileDatasetSource, FileFormat, InMemoryDatasetSource};
#[cfg(feature = "postgres")]
pub use dataset::PostgresDatasetSource;
pub use retrain::{RetrainRunner, RetrainRunnerHandle};
