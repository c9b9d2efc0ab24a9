//! Script time parsing
//!
//! Script times are either already relative seconds or absolute
//! date-times. Absolute times are made relative to the script offset, which
//! is a start date-time plus an optional signed time span.

use chrono::{DateTime, Duration, NaiveDateTime};
use pv_core::MediaTime;

use crate::script::ScriptTime;
use crate::DataError;

const DATE_TIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S%.f %p",
    "%m/%d/%Y %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse an RFC 3339 or US-style (`M/D/YYYY h:mm:ss[.f] [AM|PM]`) date-time
pub fn parse_date_time(text: &str) -> Result<NaiveDateTime, DataError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| DataError::InvalidTime(text.to_string()))
}

/// Parse a signed time span `[-][d.]hh:mm[:ss[.fffffff]]`
pub fn parse_time_span(text: &str) -> Result<Duration, DataError> {
    let invalid = || DataError::InvalidTime(text.to_string());
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid());
    }

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (d.parse::<i64>().map_err(|_| invalid())?, h),
        None => (0, parts[0]),
    };
    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = parts[1].parse().map_err(|_| invalid())?;
    let seconds: f64 = match parts.get(2) {
        Some(s) => s.parse().map_err(|_| invalid())?,
        None => 0.0,
    };
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(invalid());
    }

    let micros = days
        .checked_mul(24)
        .and_then(|h| h.checked_add(hours))
        .and_then(|h| h.checked_mul(60))
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60_000_000))
        .and_then(|us| us.checked_add((seconds * 1_000_000.0).round() as i64))
        .ok_or_else(invalid)?;
    Ok(Duration::microseconds(if negative { -micros } else { micros }))
}

/// Converts script times into media positions
#[derive(Debug, Clone, Default)]
pub struct ScriptClock {
    origin: Option<NaiveDateTime>,
}

impl ScriptClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the origin from a script offset item
    pub fn set_offset(&mut self, start: &str, delta: Option<&str>) -> Result<(), DataError> {
        let mut origin = parse_date_time(start)?;
        if let Some(delta) = delta {
            origin = origin
                .checked_add_signed(parse_time_span(delta)?)
                .ok_or_else(|| DataError::InvalidTime(format!("{} + {}", start, delta)))?;
        }
        self.origin = Some(origin);
        Ok(())
    }

    pub fn origin(&self) -> Option<NaiveDateTime> {
        self.origin
    }

    /// Position of a script time relative to the origin. May be negative.
    pub fn relative(&self, time: &ScriptTime) -> Result<MediaTime, DataError> {
        match time {
            ScriptTime::Seconds(secs) if secs.is_finite() => Ok(MediaTime::from_secs_f64(*secs)),
            ScriptTime::Seconds(secs) => Err(DataError::InvalidTime(secs.to_string())),
            ScriptTime::Stamp(text) => {
                let origin = self
                    .origin
                    .ok_or_else(|| DataError::InvalidTime(format!("{} (no script offset)", text)))?;
                let delta = parse_date_time(text)? - origin;
                let micros = delta
                    .num_microseconds()
                    .ok_or_else(|| DataError::InvalidTime(text.clone()))?;
                Ok(MediaTime::from_micros(micros))
            }
        }
    }
}
