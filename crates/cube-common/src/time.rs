//! Time handling: temporal extents and time-slice bucketing.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Parse an ISO 8601 timestamp.
///
/// Timezone-naive inputs are interpreted as UTC, the cube's reference
/// timezone. Date-only inputs resolve to midnight.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    // Try date only
    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}T00:00:00", s), "%Y-%m-%dT%H:%M:%S")
    {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// The temporal extent of an asset: a single instant or a closed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalExtent {
    Instant(DateTime<Utc>),
    Interval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TemporalExtent {
    /// The nominal timestamp used for time-slice bucketing.
    ///
    /// For intervals this is the interval start.
    pub fn nominal(&self) -> DateTime<Utc> {
        match self {
            TemporalExtent::Instant(t) => *t,
            TemporalExtent::Interval { start, .. } => *start,
        }
    }

    /// Start of the extent.
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            TemporalExtent::Instant(t) => *t,
            TemporalExtent::Interval { start, .. } => *start,
        }
    }

    /// End of the extent.
    pub fn end(&self) -> DateTime<Utc> {
        match self {
            TemporalExtent::Instant(t) => *t,
            TemporalExtent::Interval { end, .. } => *end,
        }
    }

    /// Inclusive intersection test against optional bounds.
    ///
    /// A `None` bound leaves that side unbounded. Partial overlap with an
    /// interval extent is sufficient.
    pub fn intersects(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
        if let Some(start) = start {
            if self.end() < start {
                return false;
            }
        }
        if let Some(end) = end {
            if self.start() > end {
                return false;
            }
        }
        true
    }
}

/// Granularity used to bucket asset timestamps into output time-slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrouping {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    /// No grouping: every distinct timestamp is its own slice.
    #[default]
    None,
}

impl TimeGrouping {
    /// Truncate a timestamp to the start of its enclosing period.
    ///
    /// Equal (timestamp, granularity) inputs always map to equal buckets;
    /// `TimeGrouping::None` is the identity.
    pub fn bucket(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeGrouping::Year => Utc
                .with_ymd_and_hms(ts.year(), 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(ts),
            TimeGrouping::Month => Utc
                .with_ymd_and_hms(ts.year(), ts.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(ts),
            TimeGrouping::Day => Utc
                .with_ymd_and_hms(ts.year(), ts.month(), ts.day(), 0, 0, 0)
                .single()
                .unwrap_or(ts),
            TimeGrouping::Hour => Utc
                .with_ymd_and_hms(ts.year(), ts.month(), ts.day(), ts.hour(), 0, 0)
                .single()
                .unwrap_or(ts),
            TimeGrouping::Minute => Utc
                .with_ymd_and_hms(ts.year(), ts.month(), ts.day(), ts.hour(), ts.minute(), 0)
                .single()
                .unwrap_or(ts),
            TimeGrouping::None => ts,
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        match s.to_lowercase().as_str() {
            "year" => Ok(TimeGrouping::Year),
            "month" => Ok(TimeGrouping::Month),
            "day" => Ok(TimeGrouping::Day),
            "hour" => Ok(TimeGrouping::Hour),
            "minute" => Ok(TimeGrouping::Minute),
            "none" | "time" => Ok(TimeGrouping::None),
            _ => Err(TimeParseError::InvalidGrouping(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid time grouping: {0}. Expected year|month|day|hour|minute|none")]
    InvalidGrouping(String),
}
