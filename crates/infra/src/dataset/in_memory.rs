use std::sync::RwLock;

use meteocast_core::{DatasetSnapshot, Observation};

use super::{DatasetError, DatasetSource};

/// In-memory dataset for tests/dev.
///
/// `replace` swaps the data returned by later `get` calls (simulates the
/// upstream job depositing a new dataset).
#[derive(Debug, Default)]
pub struct InMemoryDatasetSource {
    inner: RwLock<DatasetSnapshot>,
}

impl InMemoryDatasetSource {
    pub fn new(rows: impl IntoIterator<Item = Observation>) -> Self {
        Self {
            inner: RwLock::new(DatasetSnapshot::new(rows)),
        }
    }

    pub fn replace(&self, rows: impl IntoIterator<Item = Observation>) {
        let snapshot = DatasetSnapshot::new(rows);
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

impl DatasetSource for InMemoryDatasetSource {
    fn get(&self) -> Result<DatasetSnapshot, DatasetError> {
        self.inner
            .read()
            .map(|s| s.clone())
            .map_err(|_| DatasetError::Parse("in-memory dataset lock poisoned".to_string()))
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
