//! Time tokens found in log lines.
//!
//! A token is one of, tried in this order:
//!
//! - `+<duration>`: offset from the previous timestamp (`+1h10m`)
//! - `<duration>`: offset from the session start (`7m`)
//! - `H:MMAM`/`H:MMPM`: clock time on the current date (`8:10PM`)
//! - `YYYY-MM-DD H:MMPM`: an absolute timestamp
//!
//! Clock times that land "before" the previous timestamp roll over to the
//! next calendar day, see [`is_next_day`].

use std::str::FromStr;

use chrono::{Days, Duration, NaiveDateTime, NaiveTime, Timelike};

use crate::error::TimeExprError;

pub const CLOCK_FORMAT: &str = "%I:%M%p";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %I:%M%p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeExpr {
    SincePrevious(Duration),
    SinceStart(Duration),
    Clock(NaiveTime),
    Absolute(NaiveDateTime),
}

impl FromStr for TimeExpr {
    type Err = TimeExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();

        if let Some(offset) = token.strip_prefix('+') {
            return parse_duration(offset.trim())
                .map(TimeExpr::SincePrevious)
                .map_err(|err| match err {
                    DurationError::Syntax(source) => TimeExprError::Duration {
                        token: token.to_string(),
                        source,
                    },
                    DurationError::Range => TimeExprError::OutOfRange,
                    DurationError::NoUnit => TimeExprError::Unrecognized(token.to_string()),
                });
        }

        // Clock times like 8:10PM never parse as durations, so this order is safe.
        match parse_duration(token) {
            Ok(offset) => return Ok(TimeExpr::SinceStart(offset)),
            Err(DurationError::Range) => return Err(TimeExprError::OutOfRange),
            Err(DurationError::Syntax(_) | DurationError::NoUnit) => {}
        }

        if let Ok(time) = NaiveTime::parse_from_str(token, CLOCK_FORMAT) {
            return Ok(TimeExpr::Clock(time));
        }

        if let Ok(timestamp) = NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT) {
            return Ok(TimeExpr::Absolute(timestamp));
        }

        Err(TimeExprError::Unrecognized(token.to_string()))
    }
}

impl TimeExpr {
    /// Resolve against the previous timestamp (`current`) and the session
    /// start. Only clock times can roll over to the next day.
    pub fn resolve(
        self,
        current: NaiveDateTime,
        start: Option<NaiveDateTime>,
    ) -> Result<NaiveDateTime, TimeExprError> {
        match self {
            TimeExpr::SincePrevious(offset) => current
                .checked_add_signed(offset)
                .ok_or(TimeExprError::OutOfRange),
            TimeExpr::SinceStart(offset) => start
                .ok_or(TimeExprError::NoStartTime)?
                .checked_add_signed(offset)
                .ok_or(TimeExprError::OutOfRange),
            TimeExpr::Clock(time) => {
                let resolved = current.date().and_time(time);
                if is_next_day(current, resolved) {
                    resolved
                        .checked_add_days(Days::new(1))
                        .ok_or(TimeExprError::OutOfRange)
                } else {
                    Ok(resolved)
                }
            }
            TimeExpr::Absolute(timestamp) => Ok(timestamp),
        }
    }
}

/// Parse and resolve `token` in one step.
pub fn resolve(
    token: &str,
    current: NaiveDateTime,
    start: Option<NaiveDateTime>,
) -> Result<NaiveDateTime, TimeExprError> {
    token.parse::<TimeExpr>()?.resolve(current, start)
}

/// Whether a clock time placed on `current`'s date actually belongs to the
/// following day.
///
/// Never when `current` is midnight (nothing resolved yet) or unchanged.
/// Always for an afternoon-to-morning step (`8:10PM` then `7:00AM`).
/// Otherwise whenever `resolved` is earlier than `current`: logs only move
/// forward, so an apparent step back is read as less than a day forward.
/// That last rule misfires for entries written out of order.
pub fn is_next_day(current: NaiveDateTime, resolved: NaiveDateTime) -> bool {
    if current.num_seconds_from_midnight() == 0 || resolved == current {
        return false;
    }
    if current.hour() >= 12 && resolved.hour() < 12 {
        return true;
    }
    resolved < current
}

enum DurationError {
    Syntax(humantime::DurationError),
    Range,
    NoUnit,
}

/// Every duration needs a unit; humantime alone accepts a bare `0`.
fn parse_duration(token: &str) -> Result<Duration, DurationError> {
    if !token.contains(|c: char| c.is_ascii_alphabetic()) {
        return Err(DurationError::NoUnit);
    }
    let std = humantime::parse_duration(token).map_err(DurationError::Syntax)?;
    Duration::from_std(std).map_err(|_| DurationError::Range)
}
