use chrono::NaiveDateTime;
use serde::Serialize;

use crate::types::{ProbePosition, Session};

/// One point of a probe's line. `value` is `None` where the probe had no
/// reading, which renders as a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "(NaiveDateTime, Option<f64>)")]
pub struct ChartPoint {
    pub time: NaiveDateTime,
    pub value: Option<f64>,
}

impl From<ChartPoint> for (NaiveDateTime, Option<f64>) {
    fn from(point: ChartPoint) -> Self {
        (point.time, point.value)
    }
}

/// All readings for one declared probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSeries {
    pub name: String,
    pub position: ProbePosition,
    pub points: Vec<ChartPoint>,
}

impl Session {
    /// Earliest and latest timestamps across events and stages, used as the
    /// chart's x-axis bounds. `None` when there is nothing timed.
    pub fn time_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let starts = self
            .events
            .iter()
            .map(|e| e.time)
            .chain(self.stages.iter().map(|s| s.start));
        let earliest = starts.clone().min()?;
        let latest = starts
            .chain(self.stages.iter().filter_map(|s| s.end))
            .max()
            .unwrap_or(earliest);
        Some((earliest, latest))
    }

    /// One series per declared probe, ordered by position.
    ///
    /// A probe with position 0 gets an empty series.
    pub fn chart_data(&self) -> Vec<ProbeSeries> {
        let mut probes: Vec<_> = self.probes.iter().collect();
        probes.sort_by_key(|p| p.position);

        probes
            .into_iter()
            .map(|probe| {
                let points = if probe.position.is_none() {
                    Vec::new()
                } else {
                    self.data
                        .iter()
                        .map(|row| ChartPoint {
                            time: row.time,
                            value: row.reading(probe.position),
                        })
                        .collect()
                };
                ProbeSeries {
                    name: probe.name.clone(),
                    position: probe.position,
                    points,
                }
            })
            .collect()
    }
}
