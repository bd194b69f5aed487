use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("End time must be after start time")]
    EmptySpan,
}

/// Span
///
/// The rental window of a booking. Endpoints are wall-clock times without an
/// offset, the same way they are stored in the `bookings` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ScheduleError> {
        if end <= start {
            return Err(ScheduleError::EmptySpan);
        }
        Ok(Self { start, end })
    }

    /// Parses both endpoints and builds the span.
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    /// conflicts_with
    ///
    /// `self` is the requested span, `existing` a span already booked. They
    /// conflict when either requested endpoint lies inside the existing span, or
    /// the existing span sits entirely inside the requested one. Endpoints are
    /// inclusive, so back-to-back bookings sharing an instant also conflict.
    pub fn conflicts_with(&self, existing: &Span) -> bool {
        (existing.start <= self.start && existing.end >= self.start)
            || (existing.start <= self.end && existing.end >= self.end)
            || (existing.start >= self.start && existing.end <= self.end)
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Accepts the `datetime-local` form browsers submit (`2025-03-01T09:30`), the
/// same with seconds or a space separator, and RFC 3339. Offsets are folded
/// into UTC.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ScheduleError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ScheduleError::InvalidTimestamp(raw.to_string()))
}
