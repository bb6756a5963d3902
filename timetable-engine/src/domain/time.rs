//! Rail time handling.
//!
//! Timetable events are stamped with a calendar date and a time of day at
//! one-second resolution. Occupancy, traversal and maintenance periods are
//! all expressed as half-open [`TimeWindow`]s over these times.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

/// Serialized form of a [`RailTime`].
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Error returned when parsing an invalid time string or window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A date-aware time for rail events.
///
/// Services running past midnight need the date as well as the time of day,
/// so two events at "00:10" on different dates compare correctly.
///
/// # Examples
///
/// ```
/// use timetable_engine::domain::RailTime;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
/// let time = RailTime::parse_hhmm("08:20", date).unwrap();
/// assert_eq!(time.to_string(), "08:20");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RailTime(NaiveDateTime);

impl RailTime {
    /// Create a new RailTime from date and time components.
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self(date.and_time(time))
    }

    /// Create a RailTime from a full date-time.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self(dt)
    }

    /// Parse a time from "HH:MM" or "HH:MM:SS" format with a given date.
    ///
    /// # Examples
    ///
    /// ```
    /// use timetable_engine::domain::RailTime;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
    ///
    /// assert!(RailTime::parse_hhmm("00:00", date).is_ok());
    /// assert!(RailTime::parse_hhmm("23:59:30", date).is_ok());
    ///
    /// assert!(RailTime::parse_hhmm("0820", date).is_err());
    /// assert!(RailTime::parse_hhmm("25:00", date).is_err());
    /// ```
    pub fn parse_hhmm(s: &str, date: NaiveDate) -> Result<Self, TimeError> {
        let bytes = s.as_bytes();

        if bytes.len() != 5 && bytes.len() != 8 {
            return Err(TimeError::new("expected HH:MM or HH:MM:SS format"));
        }
        if bytes[2] != b':' || (bytes.len() == 8 && bytes[5] != b':') {
            return Err(TimeError::new("expected colon separators"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = if bytes.len() == 8 {
            let second = parse_two_digits(&bytes[6..8])
                .ok_or_else(|| TimeError::new("invalid second digits"))?;
            if second > 59 {
                return Err(TimeError::new("second must be 0-59"));
            }
            second
        } else {
            0
        };

        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| TimeError::new("invalid time"))?;

        Ok(Self::new(date, time))
    }

    /// Parse the wire format, `YYYY-MM-DDTHH:MM:SS`.
    ///
    /// RFC 3339 strings with an offset (`2025-09-20T08:00:00Z`) are also
    /// accepted and normalised to UTC.
    pub fn parse_iso(s: &str) -> Result<Self, TimeError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.naive_utc()).truncated());
        }
        NaiveDateTime::parse_from_str(s, WIRE_FORMAT)
            .map(Self)
            .map_err(|_| TimeError::new("expected YYYY-MM-DDTHH:MM:SS"))
    }

    /// Drop any sub-second component.
    fn truncated(self) -> Self {
        Self(self.0.with_nanosecond(0).unwrap_or(self.0))
    }

    /// Returns the date component.
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Returns the time component.
    pub fn time(&self) -> NaiveTime {
        self.0.time()
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Returns the second (0-59).
    pub fn second(&self) -> u32 {
        self.0.second()
    }

    /// Converts to a NaiveDateTime.
    pub fn to_datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Add a duration to this time, crossing midnight as needed.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Subtract a duration from this time.
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Self)
    }

    /// Returns the duration between two times.
    ///
    /// Returns a negative duration if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Whole seconds from `other` to `self`.
    pub fn seconds_since(&self, other: Self) -> i64 {
        self.signed_duration_since(other).num_seconds()
    }
}

impl Add<Duration> for RailTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.checked_add(rhs).expect("time overflow")
    }
}

impl Sub<Duration> for RailTime {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        self.checked_sub(rhs).expect("time overflow")
    }
}

impl fmt::Debug for RailTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RailTime({})", self.0.format(WIRE_FORMAT))
    }
}

impl fmt::Display for RailTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.second() == 0 {
            write!(f, "{:02}:{:02}", self.hour(), self.minute())
        } else {
            write!(
                f,
                "{:02}:{:02}:{:02}",
                self.hour(),
                self.minute(),
                self.second()
            )
        }
    }
}

impl Serialize for RailTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0.format(WIRE_FORMAT))
    }
}

impl<'de> Deserialize<'de> for RailTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_iso(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// A half-open time window `[start, end)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimeWindow {
    start: RailTime,
    end: RailTime,
}

impl TimeWindow {
    /// Create a window, rejecting `end < start`.
    pub fn new(start: RailTime, end: RailTime) -> Result<Self, TimeError> {
        if end < start {
            return Err(TimeError::new("window end is before its start"));
        }
        Ok(Self { start, end })
    }

    /// Create a window starting at `start` and lasting `length`.
    ///
    /// Negative lengths yield an empty window at `start`.
    pub fn starting_at(start: RailTime, length: Duration) -> Self {
        let end = if length > Duration::zero() {
            start + length
        } else {
            start
        };
        Self { start, end }
    }

    pub fn start(&self) -> RailTime {
        self.start
    }

    pub fn end(&self) -> RailTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the windows share at least one instant.
    ///
    /// Windows that merely touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two overlapping windows.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// True if `instant` lies inside the window.
    pub fn contains(&self, instant: RailTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// The same window moved by `delta`.
    pub fn shifted(&self, delta: Duration) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

impl fmt::Debug for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeWindow({:?}..{:?})", self.start, self.end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            start: RailTime,
            end: RailTime,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> RailTime {
        RailTime::parse_hhmm("06:00", NaiveDate::from_ymd_opt(2025, 9, 20).unwrap()).unwrap()
    }

    fn arb_window() -> impl Strategy<Value = TimeWindow> {
        (0i64..7200, 0i64..1800).prop_map(|(start, len)| {
            TimeWindow::starting_at(base() + Duration::seconds(start), Duration::seconds(len))
        })
    }

    proptest! {
        /// Overlap is symmetric
        #[test]
        fn overlap_symmetric(a in arb_window(), b in arb_window()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        /// The intersection lies inside both windows and is non-empty
        #[test]
        fn intersection_within_both(a in arb_window(), b in arb_window()) {
            if let Some(i) = a.intersection(&b) {
                prop_assert!(!i.is_empty());
                prop_assert!(i.start() >= a.start() && i.end() <= a.end());
                prop_assert!(i.start() >= b.start() && i.end() <= b.end());
            }
        }

        /// Any "HH:MM" time parses back to the same display string
        #[test]
        fn hhmm_roundtrip(h in 0u32..24, m in 0u32..60) {
            let s = format!("{:02}:{:02}", h, m);
            let d = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
            let time = RailTime::parse_hhmm(&s, d).unwrap();
            prop_assert_eq!(time.to_string(), s);
        }
    }
}
