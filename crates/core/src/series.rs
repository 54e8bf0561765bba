//! Observation rows and per-signal series.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

/// One row of the merged dataset: paired readings for one time step (hourly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub temperature: f64,
    pub humidity: f64,
    /// Source timestamp as supplied upstream; informational only.
    #[serde(default, alias = "datetime")]
    pub timestamp: Option<String>,
}

impl Observation {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn value(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Temperature => self.temperature,
            Signal::Humidity => self.humidity,
        }
    }

    fn is_complete(&self) -> bool {
        self.temperature.is_finite() && self.humidity.is_finite()
    }
}

/// A tabular snapshot of the dataset, as returned by a dataset source.
///
/// Shape on the wire: `{"data": [{"temperature": .., "humidity": .., "timestamp": ..}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub data: Vec<Observation>,
}

impl DatasetSnapshot {
    /// Build a snapshot, dropping rows with a missing (non-finite) reading.
    ///
    /// Rows keep the order they were supplied in.
    pub fn new(rows: impl IntoIterator<Item = Observation>) -> Self {
        Self {
            data: rows.into_iter().filter(Observation::is_complete).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extract the ordered series for one signal.
    pub fn series(&self, signal: Signal) -> ObservationSeries {
        ObservationSeries::new(signal, self.data.iter().map(|o| o.value(signal)))
    }
}

/// Ordered samples of a single signal, one per time step.
///
/// Immutable once built; cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    signal: Signal,
    values: Arc<[f64]>,
}

impl ObservationSeries {
    pub fn new(signal: Signal, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            signal,
            values: values.into_iter().collect(),
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent sample, if any.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}
