//! Reader for the sensor CSV exported alongside a log.
//!
//! ```text
//! DateTime,Probe 1,Probe 2,Probe 3,Probe 4
//! 2025-05-24 18:50:00,71.2,,68.0,
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::SensorError;
use crate::types::{Session, ThermoworksData};

pub const DATETIME_HEADER: &str = "DateTime";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What to do with a sensor row that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Log the row and keep going.
    #[default]
    Skip,
    /// Stop at the first bad row.
    Abort,
}

/// Single-pass iterator over sensor rows.
///
/// Each row yields its own result; a bad row does not end the iteration.
/// An I/O failure is yielded once and then the iterator stops.
pub struct SensorReader<R> {
    records: csv::StringRecordsIntoIter<R>,
    probe_names: Vec<String>,
    done: bool,
}

impl<R: Read> SensorReader<R> {
    /// Read and validate the header row.
    pub fn new(reader: R) -> Result<Self, SensorError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?;
        if headers.len() < 2 || &headers[0] != DATETIME_HEADER {
            return Err(SensorError::Header(
                headers.iter().map(str::to_string).collect(),
            ));
        }
        let probe_names = headers.iter().skip(1).map(str::to_string).collect();

        Ok(Self {
            records: csv.into_records(),
            probe_names,
            done: false,
        })
    }

    /// Column names after `DateTime`.
    pub fn probe_names(&self) -> &[String] {
        &self.probe_names
    }
}

impl SensorReader<File> {
    /// Open a CSV file. The file is closed when the reader is dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SensorError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SensorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }
}

impl<R: Read> Iterator for SensorReader<R> {
    type Item = Result<ThermoworksData, SensorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => {
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    self.done = true;
                }
                return Some(Err(err.into()));
            }
        };

        Some(parse_record(&record, self.probe_names.len()))
    }
}

fn parse_record(record: &csv::StringRecord, probes: usize) -> Result<ThermoworksData, SensorError> {
    let row = record.position().map_or(0, |p| p.line());

    let raw_time = record.get(0).unwrap_or_default();
    let time = NaiveDateTime::parse_from_str(raw_time, TIMESTAMP_FORMAT).map_err(|source| {
        SensorError::Timestamp {
            row,
            value: raw_time.to_string(),
            source,
        }
    })?;

    let mut probe_data = Vec::with_capacity(probes);
    for column in 1..=probes {
        let raw = record.get(column).unwrap_or_default();
        if raw.is_empty() {
            probe_data.push(ThermoworksData::NO_READING);
            continue;
        }
        let value = raw.parse::<f64>().map_err(|source| SensorError::Value {
            row,
            column,
            value: raw.to_string(),
            source,
        })?;
        probe_data.push(value);
    }

    Ok(ThermoworksData { time, probe_data })
}

impl Session {
    /// Drain a sensor CSV into `data`. Returns the number of rows added.
    ///
    /// A bad header always fails. Bad rows follow `policy`.
    pub fn load_sensor_data<R: Read>(
        &mut self,
        reader: R,
        policy: RowPolicy,
    ) -> Result<usize, SensorError> {
        let rows = SensorReader::new(reader)?;
        self.extend_sensor_data(rows, policy)
    }

    pub fn load_sensor_file(
        &mut self,
        path: impl AsRef<Path>,
        policy: RowPolicy,
    ) -> Result<usize, SensorError> {
        let rows = SensorReader::open(path)?;
        self.extend_sensor_data(rows, policy)
    }

    fn extend_sensor_data<R: Read>(
        &mut self,
        rows: SensorReader<R>,
        policy: RowPolicy,
    ) -> Result<usize, SensorError> {
        let mut loaded = 0;
        for row in rows {
            match row {
                Ok(data) => {
                    self.data.push(data);
                    loaded += 1;
                }
                Err(err) if policy == RowPolicy::Skip => {
                    tracing::warn!(error = %err, "Skipping sensor row");
                }
                Err(err) => return Err(err),
            }
        }
        tracing::debug!(loaded, session = %self.name, "Loaded sensor data");
        Ok(loaded)
    }
}
