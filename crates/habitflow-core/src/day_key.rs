//! Timezone-anchored calendar days.
//!
//! A [`DayKey`] is the aggregation boundary for all history: two events that
//! project onto the same key are the same day, whatever their exact instants.
//! Keys render as fixed-width `YYYY-MM-DD`, so the string form and the typed
//! ordering always agree.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IntegrityError;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day in some user's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Parse a strict `YYYY-MM-DD` key.
    ///
    /// Anything else (`2025-1-5`, `2025/01/05`, trailing time parts) is rejected.
    pub fn parse(value: &str) -> Result<Self, IntegrityError> {
        let invalid = || IntegrityError::InvalidDayKey {
            value: value.to_string(),
        };

        let bytes = value.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(invalid());
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !digits_ok {
            return Err(invalid());
        }

        NaiveDate::parse_from_str(value, DAY_KEY_FORMAT)
            .map(DayKey)
            .map_err(|_| invalid())
    }

    /// Project a UTC instant through `tz` onto its local calendar day.
    pub fn from_instant(instant: DateTime<Utc>, tz: Tz) -> Self {
        DayKey(instant.with_timezone(&tz).date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DayKey(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Shift by a signed number of days.
    pub fn add_days(&self, days: i64) -> Self {
        DayKey(self.0 + Duration::days(days))
    }

    /// Signed number of days from `other` to `self`.
    pub fn days_since(&self, other: DayKey) -> i64 {
        (self.0 - other.0).num_days()
    }

    /// Monday of the ISO week containing this day.
    pub fn week_start(&self) -> Self {
        let offset = self.0.weekday().num_days_from_monday() as i64;
        self.add_days(-offset)
    }

    /// Inclusive Monday..=Sunday bounds of this day's ISO week.
    pub fn week_bounds(&self) -> (DayKey, DayKey) {
        let start = self.week_start();
        (start, start.add_days(6))
    }

    /// Synthetic ordering instant for records that only know their day.
    pub fn noon_utc(&self) -> DateTime<Utc> {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        Utc.from_utc_datetime(&self.0.and_time(noon))
    }

    /// Whether this key falls inside the optional inclusive range.
    pub fn within(&self, start: Option<DayKey>, end: Option<DayKey>) -> bool {
        start.map_or(true, |s| *self >= s) && end.map_or(true, |e| *self <= e)
    }
}

/// Parse an RFC 3339 / ISO-8601 instant into UTC.
pub fn parse_utc_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayKey::parse(s)
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DayKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}
