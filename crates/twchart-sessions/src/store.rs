use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::builder::parse_session_reader;
use crate::thermoworks::RowPolicy;
use crate::types::{duration_secs, Session};

const LOG_EXTENSION: &str = "txt";
const DATA_EXTENSION: &str = "csv";

/// Short listing row for a stored session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveDateTime>,
    pub stages: usize,
    pub events: usize,
    pub probes: usize,
    /// Span from the earliest to the latest timestamp in the log.
    #[serde(with = "duration_secs")]
    pub duration: Option<Duration>,
    pub has_data: bool,
}

impl SessionSummary {
    pub fn new(id: impl Into<String>, session: &Session) -> Self {
        Self {
            id: id.into(),
            name: session.name.clone(),
            date: session.date,
            start_time: session.start_time,
            stages: session.stages.len(),
            events: session.events.len(),
            probes: session.probes.len(),
            duration: session.time_bounds().map(|(first, last)| last - first),
            has_data: !session.data.is_empty(),
        }
    }

    fn sort_key(&self) -> Option<NaiveDateTime> {
        self.start_time
            .or_else(|| self.date.map(|d| d.and_time(chrono::NaiveTime::MIN)))
    }
}

/// Filter for listing sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Case-insensitive substring of the session name.
    pub search: Option<String>,
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl SessionFilter {
    pub fn matches(&self, summary: &SessionSummary) -> bool {
        if let Some(ref search) = self.search {
            if !summary
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }

        let date = summary.date.or(summary.start_time.map(|t| t.date()));

        if let Some(after) = self.after {
            match date {
                Some(d) if d >= after => {}
                _ => return false,
            }
        }

        if let Some(before) = self.before {
            match date {
                Some(d) if d <= before => {}
                _ => return false,
            }
        }

        true
    }
}

/// Stable id for a log: the first 12 hex characters of its SHA-256.
pub fn session_id(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut id = hex::encode(digest);
    id.truncate(12);
    id
}

/// Parse a log file and, if a `.csv` with the same stem sits next to it,
/// drain it into the session's sensor data.
pub fn load_session_from_file(path: &Path, policy: RowPolicy) -> Result<Session> {
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open log: {:?}", path))?;
    let mut session = parse_session_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse log: {:?}", path))?;

    let csv_path = path.with_extension(DATA_EXTENSION);
    if csv_path.exists() {
        session
            .load_sensor_file(&csv_path, policy)
            .with_context(|| format!("Failed to load sensor data: {:?}", csv_path))?;
    }

    tracing::info!(
        session = %session.name,
        stages = session.stages.len(),
        rows = session.data.len(),
        "Loaded session from {:?}",
        path
    );
    Ok(session)
}

/// A directory of `<id>.txt` logs with optional `<id>.csv` sensor files.
pub struct SessionStore {
    sessions_dir: PathBuf,
    row_policy: RowPolicy,
}

impl SessionStore {
    /// Create a SessionStore on the default sessions directory.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().with_context(|| "Could not determine data directory")?;
        Ok(Self::with_dir(data_dir.join("twchart").join("sessions")))
    }

    pub fn with_dir(sessions_dir: PathBuf) -> Self {
        Self {
            sessions_dir,
            row_policy: RowPolicy::default(),
        }
    }

    pub fn with_row_policy(mut self, policy: RowPolicy) -> Self {
        self.row_policy = policy;
        self
    }

    pub fn sessions_dir(&self) -> &PathBuf {
        &self.sessions_dir
    }

    /// List sessions matching the filter, newest first.
    pub fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionSummary>> {
        if !self.sessions_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.sessions_dir)
            .with_context(|| format!("Failed to read sessions dir: {:?}", self.sessions_dir))?;

        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(id) = log_id(&path) else {
                continue;
            };

            match load_session_from_file(&path, self.row_policy) {
                Ok(session) => {
                    let summary = SessionSummary::new(id, &session);
                    if filter.matches(&summary) {
                        summaries.push(summary);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to load session {:?}: {:#}", path, e);
                }
            }
        }

        summaries.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(summaries)
    }

    /// Load a fully parsed session by id.
    pub fn load(&self, id: &str) -> Result<Session> {
        load_session_from_file(&self.log_path(id), self.row_policy)
    }

    /// Copy a log (and its sibling `.csv`, if any) into the store.
    ///
    /// The log must parse. Returns the new session id; importing the same
    /// log twice yields the same id.
    pub fn import(&self, path: &Path) -> Result<String> {
        let content =
            fs::read(path).with_context(|| format!("Failed to read log: {:?}", path))?;
        parse_session_reader(content.as_slice())
            .with_context(|| format!("Failed to parse log: {:?}", path))?;

        fs::create_dir_all(&self.sessions_dir).with_context(|| {
            format!("Failed to create sessions dir: {:?}", self.sessions_dir)
        })?;

        let id = session_id(&content);
        let log_path = self.log_path(&id);
        fs::write(&log_path, &content)
            .with_context(|| format!("Failed to write log: {:?}", log_path))?;

        let csv_source = path.with_extension(DATA_EXTENSION);
        if csv_source.exists() {
            let csv_target = log_path.with_extension(DATA_EXTENSION);
            fs::copy(&csv_source, &csv_target)
                .with_context(|| format!("Failed to copy sensor data: {:?}", csv_source))?;
        }

        tracing::info!(id = %id, "Imported session from {:?}", path);
        Ok(id)
    }

    fn log_path(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}.{}", id, LOG_EXTENSION))
    }
}

/// The id of a stored log, `None` for anything that is not a `.txt` file.
pub(crate) fn log_id(path: &Path) -> Option<String> {
    if path.extension().and_then(|s| s.to_str()) != Some(LOG_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
