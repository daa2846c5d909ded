use std::io::BufRead;
use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDateTime;

use crate::error::ParseError;
use crate::parser::{parse_line, SessionPart};
use crate::types::{Session, Stage};

impl Session {
    /// Apply one parsed line.
    ///
    /// The first stage or note also fixes `start_time`. A new stage closes
    /// the previous one if it is still open, so stages stay contiguous.
    pub fn apply(&mut self, part: SessionPart) {
        match part {
            SessionPart::SessionName(name) => {
                if self.name.is_empty() {
                    self.name = name;
                }
            }
            SessionPart::SessionDate(date) => self.date = Some(date),
            SessionPart::Probe(probe) => self.probes.push(probe),
            SessionPart::Stage(stage) => {
                self.start_time.get_or_insert(stage.start);
                self.add_stage(stage);
            }
            SessionPart::Event(event) => {
                self.start_time.get_or_insert(event.time);
                self.events.push(event);
            }
            SessionPart::DoneTime(time) => {
                if let Some(last) = self.stages.last_mut() {
                    last.finish(time);
                }
            }
        }
    }

    pub fn add_stage(&mut self, stage: Stage) {
        if let Some(previous) = self.stages.last_mut() {
            if !previous.is_finished() {
                previous.finish(stage.start);
            }
        }
        self.stages.push(stage);
    }
}

/// Folds log lines into a [`Session`], threading the current timestamp from
/// one line to the next.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    session: Session,
    current: NaiveDateTime,
    line_number: usize,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and apply one line. Blank lines are skipped.
    pub fn push_line(&mut self, line: &str) -> Result<(), ParseError> {
        self.line_number += 1;
        if line.trim().is_empty() {
            return Ok(());
        }

        let (part, current) =
            parse_line(line, self.current, self.session.start_time).map_err(|source| {
                ParseError {
                    line_number: self.line_number,
                    line: line.to_string(),
                    source,
                }
            })?;
        tracing::debug!(line_number = self.line_number, ?part, "parsed log line");

        self.current = current;
        self.session.apply(part);
        Ok(())
    }

    pub fn finish(self) -> Session {
        self.session
    }
}

/// Parse a whole log document. Any bad line fails the whole document.
pub fn parse_session(input: &str) -> Result<Session, ParseError> {
    let mut builder = SessionBuilder::new();
    for line in input.lines() {
        builder.push_line(line)?;
    }
    Ok(builder.finish())
}

/// Like [`parse_session`], reading lines from `reader`.
pub fn parse_session_reader<R: BufRead>(reader: R) -> anyhow::Result<Session> {
    let mut builder = SessionBuilder::new();
    for line in reader.lines() {
        let line = line.context("Failed to read log line")?;
        builder.push_line(&line)?;
    }
    Ok(builder.finish())
}

impl FromStr for Session {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_session(s)
    }
}
