//! Parsing of the time arguments accepted by `add`, `edit` and `log`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::clock::truncate_to_minute;
use crate::domain::TIMESTAMP_FORMAT;
use crate::error::TrackError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Parses `now`, `HH:MM`, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM`.
///
/// A bare time is placed on `reference.date()`, a bare date keeps
/// `reference.time()`.
pub fn parse_time_input(
    input: &str,
    now: NaiveDateTime,
    reference: NaiveDateTime,
) -> Result<NaiveDateTime, TrackError> {
    let trimmed = input.trim();
    let invalid = || TrackError::InvalidTime {
        input: input.to_string(),
    };

    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(truncate_to_minute(now));
    }

    if let Ok(time) = NaiveTime::parse_from_str(trimmed, TIME_FORMAT) {
        return Ok(reference.date().and_time(time));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(truncate_to_minute(date.and_time(reference.time())));
    }

    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).map_err(|_| invalid())
}

/// True when the input names a whole day rather than an instant.
pub fn is_date_only(input: &str) -> bool {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).is_ok()
}
