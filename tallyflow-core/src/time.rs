// Copyright 2025 Tallyflow (https://github.com/tallyflow)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hour-resolution timestamps.
//!
//! Counters are bucketed by hour, so the whole system speaks `YYYY-MM-DDThh`:
//! a calendar date plus an hour of day, nothing finer. `DateHour` parses and
//! prints that form and exposes the calendar-correct day arithmetic the
//! segment planner needs (month lengths and leap days come from `chrono`,
//! never from fixed 24h offsets).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Failure to parse a `YYYY-MM-DDThh` string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateHourParseError {
    #[error("expected YYYY-MM-DDThh, got {0:?}")]
    Format(String),

    #[error("{0:?} is not a valid calendar date")]
    CalendarDate(String),

    #[error("hour out of range in {0:?}")]
    Hour(String),
}

/// A calendar date plus an hour of day (0..=23).
///
/// Ordering is chronological: date first, then hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateHour {
    date: NaiveDate,
    hour: u8,
}

impl DateHour {
    /// Build from a date and an hour. Returns `None` if `hour > 23`.
    pub fn new(date: NaiveDate, hour: u8) -> Option<Self> {
        (hour <= 23).then_some(Self { date, hour })
    }

    /// Build from calendar components. Returns `None` for impossible dates
    /// or hours.
    pub fn from_ymd_h(year: i32, month: u32, day: u32, hour: u8) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(|date| Self::new(date, hour))
    }

    /// Hour 0 of the given date.
    pub fn day_start(date: NaiveDate) -> Self {
        Self { date, hour: 0 }
    }

    /// Hour 23 of the given date.
    pub fn day_end(date: NaiveDate) -> Self {
        Self { date, hour: 23 }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Hour 0 of this timestamp's date.
    pub fn start_of_day(&self) -> Self {
        Self::day_start(self.date)
    }

    /// Hour 23 of this timestamp's date.
    pub fn end_of_day(&self) -> Self {
        Self::day_end(self.date)
    }

    pub fn is_day_start(&self) -> bool {
        self.hour == 0
    }

    pub fn is_day_end(&self) -> bool {
        self.hour == 23
    }

    /// The next hour, rolling over day/month/year boundaries.
    ///
    /// `None` only at the end of chrono's representable calendar.
    pub fn succ(&self) -> Option<Self> {
        if self.hour < 23 {
            Some(Self {
                date: self.date,
                hour: self.hour + 1,
            })
        } else {
            self.date.succ_opt().map(Self::day_start)
        }
    }

    /// Whole days between the two dates, ignoring hours. Negative when
    /// `other` is earlier.
    pub fn days_until(&self, other: &Self) -> i64 {
        (other.date - self.date).num_days()
    }
}

impl fmt::Display for DateHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{:02}", self.date.format("%Y-%m-%d"), self.hour)
    }
}

impl FromStr for DateHour {
    type Err = DateHourParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let layout_ok = bytes.len() == 13
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes[10] == b'T'
            && [0, 1, 2, 3, 5, 6, 8, 9, 11, 12]
                .iter()
                .all(|&i| bytes[i].is_ascii_digit());

        if !layout_ok {
            return Err(DateHourParseError::Format(s.to_string()));
        }

        let year: i32 = s[0..4].parse().map_err(|_| DateHourParseError::Format(s.to_string()))?;
        let month: u32 = s[5..7].parse().map_err(|_| DateHourParseError::Format(s.to_string()))?;
        let day: u32 = s[8..10].parse().map_err(|_| DateHourParseError::Format(s.to_string()))?;
        let hour: u8 = s[11..13].parse().map_err(|_| DateHourParseError::Format(s.to_string()))?;

        if hour > 23 {
            return Err(DateHourParseError::Hour(s.to_string()));
        }

        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| DateHourParseError::CalendarDate(s.to_string()))?;

        Ok(Self { date, hour })
    }
}

impl Serialize for DateHour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateHour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
