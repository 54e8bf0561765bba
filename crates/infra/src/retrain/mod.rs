//! Periodic retraining (optional subsystem).
//!
//! Picks up new merged data by invalidating the model cache on a schedule or
//! on demand. Failures are logged and retried; they never reach request handlers.

pub mod runner;

pub use runner::{RetrainRunner, RetrainRunnerHandle};
