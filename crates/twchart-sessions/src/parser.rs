use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::LineError;
use crate::time_expr;
use crate::types::{Event, Probe, ProbePosition, Stage};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One classified log line, applied to a session by
/// [`Session::apply`](crate::types::Session::apply).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPart {
    SessionName(String),
    SessionDate(NaiveDate),
    Probe(Probe),
    Stage(Stage),
    Event(Event),
    DoneTime(NaiveDateTime),
}

/// Classify a single non-blank line.
///
/// `current` is the most recent resolved timestamp (or the session date at
/// midnight) and `start` the session start. Returns the part together with
/// the new value of `current`.
///
/// Lines are matched in priority order: no colon (session name), probe
/// declaration, note, then `<label>: <value>` where the label is `Date`,
/// `Done`, or a stage name.
pub fn parse_line(
    line: &str,
    current: NaiveDateTime,
    start: Option<NaiveDateTime>,
) -> Result<(SessionPart, NaiveDateTime), LineError> {
    let line = line.trim();
    let Some((label, value)) = line.split_once(':') else {
        return Ok((SessionPart::SessionName(line.to_string()), current));
    };
    let label = label.trim();
    let value = value.trim();

    if let Some(probe) = parse_probe(label, value)? {
        return Ok((SessionPart::Probe(probe), current));
    }

    if label.eq_ignore_ascii_case("note") {
        let event = parse_note(value, current, start)?;
        let time = event.time;
        return Ok((SessionPart::Event(event), time));
    }

    if label.is_empty() {
        return Err(LineError::EmptyLabel);
    }

    if label.eq_ignore_ascii_case("date") {
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| {
            LineError::Date {
                value: value.to_string(),
                source,
            }
        })?;
        return Ok((SessionPart::SessionDate(date), date.and_time(NaiveTime::MIN)));
    }

    let time = time_expr::resolve(value, current, start)?;

    if label.eq_ignore_ascii_case("done") {
        return Ok((SessionPart::DoneTime(time), time));
    }

    Ok((SessionPart::Stage(Stage::new(label, time)), time))
}

/// `<name> Probe: <n>`. Returns `Ok(None)` when the line is not shaped like a
/// probe declaration.
fn parse_probe(label: &str, value: &str) -> Result<Option<Probe>, LineError> {
    const KEYWORD: &str = "probe";

    let split = label.len().saturating_sub(KEYWORD.len());
    let (Some(name), Some(keyword)) = (label.get(..split), label.get(split..)) else {
        return Ok(None);
    };
    if !keyword.eq_ignore_ascii_case(KEYWORD) || !name.ends_with(char::is_whitespace) {
        return Ok(None);
    }
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }

    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let digits = &value[..digits_end];
    if digits.is_empty() {
        return Ok(None);
    }

    let position: ProbePosition = digits.parse()?;
    Ok(Some(Probe {
        name: name.to_string(),
        position,
    }))
}

/// `<time>: <text>`, split at the first colon followed by whitespace or the
/// end of the line. Colons inside clock times are followed by digits.
fn parse_note(
    value: &str,
    current: NaiveDateTime,
    start: Option<NaiveDateTime>,
) -> Result<Event, LineError> {
    let separator = value.char_indices().find(|&(i, c)| {
        c == ':'
            && value[i + 1..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace)
    });
    let Some((i, _)) = separator else {
        return Err(LineError::NoteFormat);
    };

    let time = time_expr::resolve(&value[..i], current, start)?;
    Ok(Event {
        note: value[i + 1..].trim().to_string(),
        time,
    })
}
