//! Lookback window model

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// A trailing time window `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build the window of length `lookback` ending at `now`.
    pub fn ending_at(now: DateTime<Utc>, lookback: std::time::Duration) -> Result<Self> {
        let span = Duration::from_std(lookback)
            .map_err(|_| Error::config(format!("lookback {lookback:?} is out of range")))?;
        if span <= Duration::zero() {
            return Err(Error::config("lookback must be greater than zero"));
        }

        let start = now.checked_sub_signed(span).ok_or_else(|| {
            Error::config(format!("lookback {lookback:?} starts before the representable range"))
        })?;

        Ok(Self { start, end: now })
    }

    /// Inclusive lower bound
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the window
    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Start as sent to the metrics source, e.g. `2024-01-01T00:00:00.000Z`
    pub fn start_iso(&self) -> String {
        format_instant(self.start)
    }

    /// End as sent to the metrics source
    pub fn end_iso(&self) -> String {
        format_instant(self.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.start_iso(), self.end_iso())
    }
}

/// Fixed-width RFC 3339 form with millisecond precision, so strings sort like instants.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
