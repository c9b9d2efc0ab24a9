//! Media timeline positions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A position on the media timeline, in microseconds relative to the
/// script offset. Negative values only exist while a log is being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime(0);

    /// Create a position from microseconds
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create a position from whole milliseconds
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000)
    }

    /// Create a position from fractional seconds, as reported by media players
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() {
            return Self::ZERO;
        }
        Self((secs * 1_000_000.0).round() as i64)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Distance to a later position, or `None` if `later` is not after `self`
    pub fn until(self, later: MediaTime) -> Option<Duration> {
        let delta = later.0.checked_sub(self.0)?;
        if delta <= 0 {
            return None;
        }
        Some(Duration::from_micros(delta as u64))
    }
}

impl From<Duration> for MediaTime {
    fn from(duration: Duration) -> Self {
        Self(duration.as_micros().min(i64::MAX as u128) as i64)
    }
}

impl Add<Duration> for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: Duration) -> MediaTime {
        MediaTime(self.0.saturating_add(MediaTime::from(rhs).0))
    }
}

impl Sub for MediaTime {
    type Output = i64;

    /// Signed difference in microseconds
    fn sub(self, rhs: MediaTime) -> i64 {
        self.0.saturating_sub(rhs.0)
    }
}

/// Formats as `H:mm:ss.f`, the layout used for TOC entry labels
impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let micros = self.0.unsigned_abs();
        let tenths = (micros / 100_000) % 10;
        let total_secs = micros / 1_000_000;
        let hours = total_secs / 3600;
        let minutes = (total_secs / 60) % 60;
        let seconds = total_secs % 60;
        write!(f, "{}{}:{:02}:{:02}.{}", sign, hours, minutes, seconds, tenths)
    }
}

/// Direction of a discontinuous change in playback position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
    /// Moving to an earlier position, or restarting from zero
    Backward,
    /// Moving to a later position, or staying put
    Forward,
}

impl JumpDirection {
    pub fn of(from: MediaTime, to: MediaTime) -> Self {
        if from > to || to == MediaTime::ZERO {
            JumpDirection::Backward
        } else {
            JumpDirection::Forward
        }
    }
}
