use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use twchart_sessions::{
    load_session_from_file, parse_session_reader, BreadData, Event, ProbeSeries, RowPolicy,
    Session,
};

use crate::ui::print_session_detail;

/// Load a log, with sensor data from `csv` or else from the sibling `.csv`.
pub fn load_session(log: &Path, csv: Option<&Path>, policy: RowPolicy) -> Result<Session> {
    let Some(csv) = csv else {
        return load_session_from_file(log, policy);
    };

    let file = File::open(log).with_context(|| format!("Failed to open log: {:?}", log))?;
    let mut session = parse_session_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse log: {:?}", log))?;
    session
        .load_sensor_file(csv, policy)
        .with_context(|| format!("Failed to load sensor data: {:?}", csv))?;
    Ok(session)
}

pub fn handle_parse(log: &Path, csv: Option<&Path>, json: bool, policy: RowPolicy) -> Result<()> {
    let session = load_session(log, csv, policy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_session_detail(&session);
    }
    Ok(())
}

/// Everything needed to draw one session's chart.
#[derive(Debug, Serialize)]
pub struct ChartOutput<'a> {
    pub name: &'a str,
    pub bounds: Option<(NaiveDateTime, NaiveDateTime)>,
    pub stages: Vec<StageArea>,
    pub events: &'a [Event],
    pub series: Vec<ProbeSeries>,
}

/// A shaded interval on the chart.
#[derive(Debug, Serialize)]
pub struct StageArea {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl<'a> ChartOutput<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            name: &session.name,
            bounds: session.time_bounds(),
            stages: session
                .stages
                .iter()
                .map(|s| StageArea {
                    label: s.label(),
                    start: s.start,
                    end: s.end,
                })
                .collect(),
            events: &session.events,
            series: session.chart_data(),
        }
    }
}

pub fn handle_chart(log: &Path, csv: Option<&Path>, policy: RowPolicy) -> Result<()> {
    let session = load_session(log, csv, policy)?;
    let chart = ChartOutput::new(&session);
    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}

/// Read a fixed-stage bread record and print it as a list-model session.
pub fn handle_legacy(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let bread: BreadData = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let session = Session::from(bread);
    tracing::debug!(stages = session.stages.len(), "Converted legacy record");
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}
