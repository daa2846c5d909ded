use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ProbePositionError;

/// One tracked process run (a bake, a roast) built from a log document.
///
/// Timestamps are wall-clock values in the host's local zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub date: Option<NaiveDate>,
    /// Time of the first stage or note; anchor for offsets like `7m`.
    pub start_time: Option<NaiveDateTime>,
    pub probes: Vec<Probe>,
    pub stages: Vec<Stage>,
    pub events: Vec<Event>,
    #[serde(default)]
    pub data: Vec<ThermoworksData>,
}

/// A named interval. Created open, closed by [`Stage::finish`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    #[serde(default, with = "duration_secs")]
    pub duration: Option<Duration>,
}

impl Stage {
    pub fn new(name: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            start,
            end: None,
            duration: None,
        }
    }

    pub fn finish(&mut self, end: NaiveDateTime) {
        self.end = Some(end);
        self.duration = Some(end - self.start);
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    /// Label used for the stage's mark area, e.g. `Bake (25m)`.
    pub fn label(&self) -> String {
        match self.duration {
            Some(duration) => format!("{} ({})", self.name, format_duration(duration)),
            None => self.name.clone(),
        }
    }
}

/// A timestamped free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub note: String,
    pub time: NaiveDateTime,
}

/// A named sensor bound to a column of the sensor CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub name: String,
    pub position: ProbePosition,
}

/// 1-based probe column. `0` means the probe is not connected.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct ProbePosition(u8);

impl ProbePosition {
    pub const NONE: ProbePosition = ProbePosition(0);
    pub const MAX: u8 = 5;

    pub fn new(position: u8) -> Result<Self, ProbePositionError> {
        if position > Self::MAX {
            return Err(ProbePositionError::OutOfRange(position.into()));
        }
        Ok(Self(position))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Index into [`ThermoworksData::probe_data`], `None` for [`ProbePosition::NONE`].
    pub fn index(self) -> Option<usize> {
        usize::from(self.0).checked_sub(1)
    }
}

impl FromStr for ProbePosition {
    type Err = ProbePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s.trim().parse().map_err(|source| ProbePositionError::Invalid {
            value: s.to_string(),
            source,
        })?;
        let position =
            u8::try_from(value).map_err(|_| ProbePositionError::OutOfRange(value))?;
        Self::new(position)
    }
}

impl TryFrom<u8> for ProbePosition {
    type Error = ProbePositionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProbePosition> for u8 {
    fn from(position: ProbePosition) -> Self {
        position.0
    }
}

impl fmt::Display for ProbePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the sensor CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermoworksData {
    pub time: NaiveDateTime,
    /// Indexed by probe position - 1. Values `<= 0` are "no reading".
    pub probe_data: Vec<f64>,
}

impl ThermoworksData {
    /// Stored for an empty CSV cell.
    pub const NO_READING: f64 = -1.0;

    /// The reading at `position`, or `None` when the probe is unset, the
    /// column is missing, or the cell holds the no-reading sentinel.
    pub fn reading(&self, position: ProbePosition) -> Option<f64> {
        let value = *self.probe_data.get(position.index()?)?;
        (value > 0.0).then_some(value)
    }
}

/// Compact human form of a duration: `12h 9m`, `25m`, `-5m`.
pub fn format_duration(duration: Duration) -> String {
    let (sign, magnitude) = if duration < Duration::zero() {
        ("-", -duration)
    } else {
        ("", duration)
    };
    match magnitude.to_std() {
        Ok(std) if !std.is_zero() => format!("{}{}", sign, humantime::format_duration(std)),
        _ => "0s".to_string(),
    }
}

/// Serializes `Option<Duration>` as whole seconds.
pub(crate) mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.num_seconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<i64>::deserialize(d)?;
        Ok(secs.and_then(Duration::try_seconds))
    }
}
