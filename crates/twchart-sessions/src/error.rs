use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use thiserror::Error;

/// A time token that could not be turned into a timestamp.
#[derive(Error, Debug)]
pub enum TimeExprError {
    #[error("unrecognized time expression {0:?}")]
    Unrecognized(String),

    #[error("invalid duration {token:?}: {source}")]
    Duration {
        token: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("time expression is out of range")]
    OutOfRange,

    #[error("offset from session start used before any stage or note")]
    NoStartTime,
}

#[derive(Error, Debug)]
pub enum ProbePositionError {
    #[error("invalid ProbePosition {value:?}: {source}")]
    Invalid {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid ProbePosition: {0} (expected 0-5)")]
    OutOfRange(u64),
}

/// Failure to classify or resolve a single log line.
#[derive(Error, Debug)]
pub enum LineError {
    #[error("note is missing the ':' between time and text")]
    NoteFormat,

    #[error("line has an empty label")]
    EmptyLabel,

    #[error("error parsing date {value:?}: {source}")]
    Date {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("error parsing probe: {0}")]
    Probe(#[from] ProbePositionError),

    #[error("error parsing time: {0}")]
    Time(#[from] TimeExprError),
}

/// A log document that failed to parse. Ingestion stops at the first bad line.
#[derive(Error, Debug)]
#[error("line {line_number}: {source} (in {line:?})")]
pub struct ParseError {
    pub line_number: usize,
    pub line: String,
    #[source]
    pub source: LineError,
}

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("unexpected header format: {0:?}")]
    Header(Vec<String>),

    #[error("error reading csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: invalid timestamp {value:?}: {source}")]
    Timestamp {
        row: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("row {row}, column {column}: invalid reading {value:?}: {source}")]
    Value {
        row: u64,
        column: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("error opening {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
