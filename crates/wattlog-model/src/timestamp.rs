//! Timestamp normalizer for the loosely-encoded instants in the sheet.
//!
//! The logger firmware writes timestamps in two shapes, depending on which
//! sheet (and firmware revision) produced the row:
//!
//! - day-first: `25/02/2026 9:21:19` — `/`-separated date, `:`-separated
//!   time, hour may be one or two digits;
//! - year-first: `2026-02-26T9:59:59` — ISO-like with a literal `T` (a space
//!   is tolerated) between date and time.
//!
//! Both are wall-clock values with no timezone. They are normalized exactly
//! as written — no offset math, no rounding. Parsing is a pure function; the
//! substitute-current-time fallback on failure is the caller's policy, not
//! this module's.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Why a source timestamp could not be normalized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampParseError {
    #[error("empty timestamp")]
    Empty,
    #[error("missing date/time separator in {0:?}")]
    MissingSeparator(String),
    #[error("malformed field in {0:?}")]
    MalformedField(String),
    #[error("no such calendar instant: {0:?}")]
    InvalidCalendar(String),
}

/// Parse a source timestamp into a wall-clock instant.
///
/// Family detection: a `/` anywhere in the string selects the day-first
/// form, otherwise the year-first form is assumed. Every field must be a
/// non-empty integer and the assembled calendar date must exist (rejecting
/// e.g. `31/02/2026`).
pub fn parse_source_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimestampParseError::Empty);
    }

    let (year, month, day, time_part) = if trimmed.contains('/') {
        let (date_part, time_part) = trimmed
            .split_once(' ')
            .ok_or_else(|| TimestampParseError::MissingSeparator(raw.to_string()))?;
        let [day, month, year] = split_fields(date_part, '/', raw)?;
        (year, month, day, time_part)
    } else {
        let (date_part, time_part) = trimmed
            .split_once('T')
            .or_else(|| trimmed.split_once(' '))
            .ok_or_else(|| TimestampParseError::MissingSeparator(raw.to_string()))?;
        let [year, month, day] = split_fields(date_part, '-', raw)?;
        (year, month, day, time_part)
    };

    let [hour, minute, second] = split_fields(time_part, ':', raw)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| TimestampParseError::InvalidCalendar(raw.to_string()))
}

/// Split into exactly three integer fields, rejecting empties.
fn split_fields(part: &str, sep: char, raw: &str) -> Result<[u32; 3], TimestampParseError> {
    let mut fields = part.split(sep);
    let mut out = [0u32; 3];
    for slot in &mut out {
        let field = fields
            .next()
            .ok_or_else(|| TimestampParseError::MalformedField(raw.to_string()))?;
        *slot = parse_field(field, raw)?;
    }
    if fields.next().is_some() {
        return Err(TimestampParseError::MalformedField(raw.to_string()));
    }
    Ok(out)
}

fn parse_field(field: &str, raw: &str) -> Result<u32, TimestampParseError> {
    if field.is_empty() {
        return Err(TimestampParseError::MalformedField(raw.to_string()));
    }
    field
        .parse::<u32>()
        .map_err(|_| TimestampParseError::MalformedField(raw.to_string()))
}
