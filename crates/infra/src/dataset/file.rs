//! File-backed dataset (the merged CSV written upstream, or a JSON export).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use meteocast_core::DatasetSnapshot;

use super::{DatasetError, DatasetSource, RawRow};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileFormat {
    /// Header `datetime,temperature,humidity` (column order free).
    Csv,
    /// `{"data": [{"temperature": .., "humidity": .., "timestamp": ..}]}`.
    Json,
}

impl FileFormat {
    /// `.json` files are JSON; everything else is treated as CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Csv,
        }
    }
}

/// Reads the dataset file afresh on every `get`.
#[derive(Debug, Clone)]
pub struct FileDatasetSource {
    path: PathBuf,
    format: FileFormat,
}

impl FileDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<BufReader<File>, DatasetError> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|source| DatasetError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn read_csv(&self) -> Result<DatasetSnapshot, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(self.open()?);

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for (idx, record) in reader.deserialize::<RawRow>().enumerate() {
            // +2: header line, 1-based numbering.
            let row = record.map_err(|e| DatasetError::Parse(format!("line {}: {e}", idx + 2)))?;
            match row.into_observation() {
                Some(o) => rows.push(o),
                None => dropped += 1,
            }
        }

        debug!(path = %self.path.display(), rows = rows.len(), dropped, "csv dataset read");
        Ok(DatasetSnapshot::new(rows))
    }

    fn read_json(&self) -> Result<DatasetSnapshot, DatasetError> {
        #[derive(Deserialize)]
        struct Document {
            data: Vec<RawRow>,
        }

        let doc: Document = serde_json::from_reader(self.open()?)
            .map_err(|e| DatasetError::Parse(e.to_string()))?;

        Ok(DatasetSnapshot::new(
            doc.data.into_iter().filter_map(RawRow::into_observation),
        ))
    }
}

impl DatasetSource for FileDatasetSource {
    fn get(&self) -> Result<DatasetSnapshot, DatasetError> {
        match self.format {
            FileFormat::Csv => self.read_csv(),
            FileFormat::Json => self.read_json(),
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use meteocast_core::Signal;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_merged_csv_and_drops_missing_rows() {
        let file = write_temp(
            ".csv",
            "datetime,temperature,humidity\n\
             2012-10-01 13:00:00,291.87,88.0\n\
             2012-10-01 14:00:00,,87.0\n\
             2012-10-01 15:00:00,291.87,\n\
             2012-10-01 16:00:00,291.90,86.0\n",
        );

        let snapshot = FileDatasetSource::new(file.path()).get().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.series(Signal::Temperature).values(), &[291.87, 291.90]);
        assert_eq!(snapshot.series(Signal::Humidity).values(), &[88.0, 86.0]);
        assert_eq!(snapshot.data[0].timestamp.as_deref(), Some("2012-10-01 13:00:00"));
    }

    #[test]
    fn reads_json_export() {
        let file = write_temp(
            ".json",
            r#"{"data":[
                {"temperature": 10.5, "humidity": 60.0, "timestamp": "t0"},
                {"temperature": null, "humidity": 61.0, "timestamp": "t1"},
                {"temperature": 11.0, "humidity": 62.0, "timestamp": "t2"}
            ]}"#,
        );

        let source = FileDatasetSource::new(file.path());
        assert!(source.describe().starts_with("file:"));

        let snapshot = source.get().unwrap();
        assert_eq!(snapshot.series(Signal::Temperature).values(), &[10.5, 11.0]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FileDatasetSource::new("/definitely/not/here.csv").get().unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn malformed_csv_reports_line() {
        let file = write_temp(".csv", "datetime,temperature,humidity\nx,not-a-number,1.0\n");
        let err = FileDatasetSource::new(file.path()).get().unwrap_err();
        match err {
            DatasetError::Parse(msg) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let file = write_temp(".txt", r#"{"data":[{"temperature": 1.0, "humidity": 2.0}]}"#);
        let source = FileDatasetSource::new(file.path()).with_format(FileFormat::Json);

        assert_eq!(source.path(), file.path());
        assert_eq!(source.get().unwrap().len(), 1);
    }
}
