use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use super::error::IntervalError;

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl IntervalUnit {
    fn nanos(&self) -> i64 {
        match self {
            Self::Second => NANOS_PER_SECOND,
            Self::Minute => 60 * NANOS_PER_SECOND,
            Self::Hour => 3_600 * NANOS_PER_SECOND,
            Self::Day => NANOS_PER_DAY,
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "min",
            Self::Hour => "h",
            Self::Day => "d",
        }
    }
}

/// A fixed time span written the way the resampling rules are written in the output
/// paths and column names, e.g. `10min`, `6h`, `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    count: u32,
    unit: IntervalUnit,
}

impl Interval {
    pub fn seconds(count: u32) -> Self {
        Self {
            count,
            unit: IntervalUnit::Second,
        }
    }

    pub fn minutes(count: u32) -> Self {
        Self {
            count,
            unit: IntervalUnit::Minute,
        }
    }

    pub fn hours(count: u32) -> Self {
        Self {
            count,
            unit: IntervalUnit::Hour,
        }
    }

    pub fn days(count: u32) -> Self {
        Self {
            count,
            unit: IntervalUnit::Day,
        }
    }

    pub fn as_nanos(&self) -> i64 {
        self.count as i64 * self.unit.nanos()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::minutes(10)
    }
}

impl FromStr for Interval {
    type Err = IntervalError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IntervalError::Empty);
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count_str, unit_str) = s.split_at(split);
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| IntervalError::BadCount(s.to_string()))?
        };
        let unit = match unit_str {
            "s" | "S" | "sec" => IntervalUnit::Second,
            "min" | "m" | "T" => IntervalUnit::Minute,
            "h" | "H" => IntervalUnit::Hour,
            "d" | "D" => IntervalUnit::Day,
            _ => return Err(IntervalError::UnknownUnit(s.to_string())),
        };
        if count == 0 {
            return Err(IntervalError::NonPositive(s.to_string()));
        }
        Ok(Self { count, unit })
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.count, self.unit.alias())
    }
}

impl TryFrom<String> for Interval {
    type Error = IntervalError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.to_string()
    }
}

/// Nanoseconds since the Unix epoch for a UTC datetime
pub fn to_nanos(datetime: PrimitiveDateTime) -> i64 {
    datetime.assume_utc().unix_timestamp_nanos() as i64
}

/// UTC datetime for nanoseconds since the Unix epoch
pub fn from_nanos(nanos: i64) -> PrimitiveDateTime {
    let datetime = OffsetDateTime::UNIX_EPOCH + Duration::nanoseconds(nanos);
    PrimitiveDateTime::new(datetime.date(), datetime.time())
}

/// Nanoseconds since the Unix epoch for midnight UTC of a date
pub fn date_to_nanos(date: Date) -> i64 {
    to_nanos(PrimitiveDateTime::new(date, Time::MIDNIGHT))
}

/// Midnight (UTC) of the day containing the timestamp
pub fn floor_to_day(nanos: i64) -> i64 {
    nanos - nanos.rem_euclid(NANOS_PER_DAY)
}
