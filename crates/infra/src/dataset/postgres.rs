//! Postgres-backed dataset source (feature `postgres`).
//!
//! Expects the merged dataset imported into a table with columns
//! `datetime`, `temperature`, `humidity` (one row per hour).

use sqlx::{PgPool, Row};
use tokio::runtime::Handle;

use meteocast_core::{DatasetSnapshot, Observation};

use super::{DatasetError, DatasetSource};

/// Reads the whole observations table, ordered by time.
///
/// `get` blocks on the given runtime handle, so it must be called from a plain
/// thread (the cache trains on one), never from inside an async task.
pub struct PostgresDatasetSource {
    pool: PgPool,
    handle: Handle,
    table: String,
}

impl PostgresDatasetSource {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self {
            pool,
            handle,
            table: "observations".to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

impl DatasetSource for PostgresDatasetSource {
    fn get(&self) -> Result<DatasetSnapshot, DatasetError> {
        let sql = format!(
            "SELECT datetime::text AS datetime, temperature::float8 AS temperature, \
             humidity::float8 AS humidity FROM {} ORDER BY datetime",
            self.table
        );

        let rows = self
            .handle
            .block_on(sqlx::query(&sql).fetch_all(&self.pool))
            .map_err(|e| DatasetError::Database(e.to_string()))?;

        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            let temperature: Option<f64> = row
                .try_get("temperature")
                .map_err(|e| DatasetError::Database(e.to_string()))?;
            let humidity: Option<f64> = row
                .try_get("humidity")
                .map_err(|e| DatasetError::Database(e.to_string()))?;
            let timestamp: Option<String> = row
                .try_get("datetime")
                .map_err(|e| DatasetError::Database(e.to_string()))?;

            if let (Some(t), Some(h)) = (temperature, humidity) {
                let observation = Observation::new(t, h);
                observations.push(match timestamp {
                    Some(ts) => observation.with_timestamp(ts),
                    None => observation,
                });
            }
        }

        Ok(DatasetSnapshot::new(observations))
    }

    fn describe(&self) -> String {
        format!("postgres:{}", self.table)
    }
}
