//! ISO-8601 durations for policy delays.
//!
//! Only the calendar-independent designators are accepted: weeks, days, hours,
//! minutes and seconds (`P2W`, `P14D`, `PT36H`, `P1DT12H30M`). Years and months are
//! rejected because their length depends on the date they are applied to.

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
            .expect("duration pattern is a valid regex")
    })
}

/// A non-negative, calendar-independent ISO-8601 duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDuration(Duration);

impl IsoDuration {
    /// Creates a duration from a whole number of seconds.
    ///
    /// Returns `None` for negative values.
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        if seconds < 0 {
            return None;
        }
        Duration::try_seconds(seconds).map(Self)
    }

    /// Creates a duration of whole days.
    pub fn from_days(days: i64) -> Option<Self> {
        days.checked_mul(SECONDS_PER_DAY).and_then(Self::from_seconds)
    }

    /// Returns the duration as a `chrono::Duration`.
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Returns `true` for a zero length duration.
    pub fn is_zero(&self) -> bool {
        self.0 == Duration::zero()
    }
}

impl FromStr for IsoDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let date_part = value.split('T').next().unwrap_or_default();
        if date_part.contains('Y') || date_part.contains('M') {
            return Err("years and months are not supported, use weeks or days".to_string());
        }

        let captures = duration_pattern()
            .captures(value)
            .ok_or_else(|| "expected an ISO-8601 duration such as P14D or PT12H".to_string())?;

        if value == "P" || value.ends_with('T') {
            return Err("duration has no components".to_string());
        }

        let units = [
            SECONDS_PER_WEEK,
            SECONDS_PER_DAY,
            SECONDS_PER_HOUR,
            SECONDS_PER_MINUTE,
            1,
        ];

        let mut total: i64 = 0;
        for (index, unit) in units.iter().enumerate() {
            let Some(component) = captures.get(index + 1) else {
                continue;
            };

            let amount: i64 = component
                .as_str()
                .parse()
                .map_err(|_| format!("component '{}' is too large", component.as_str()))?;

            total = amount
                .checked_mul(*unit)
                .and_then(|seconds| total.checked_add(seconds))
                .ok_or_else(|| "duration is too large".to_string())?;
        }

        Self::from_seconds(total).ok_or_else(|| "duration is too large".to_string())
    }
}

impl fmt::Display for IsoDuration {
    /// Formats the duration in canonical form, e.g. `P14D` or `P1DT12H`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seconds = self.0.num_seconds();
        if seconds == 0 {
            return write!(f, "PT0S");
        }

        let days = seconds / SECONDS_PER_DAY;
        seconds %= SECONDS_PER_DAY;
        let hours = seconds / SECONDS_PER_HOUR;
        seconds %= SECONDS_PER_HOUR;
        let minutes = seconds / SECONDS_PER_MINUTE;
        seconds %= SECONDS_PER_MINUTE;

        write!(f, "P")?;
        if days > 0 {
            write!(f, "{}D", days)?;
        }
        if hours > 0 || minutes > 0 || seconds > 0 {
            write!(f, "T")?;
            if hours > 0 {
                write!(f, "{}H", hours)?;
            }
            if minutes > 0 {
                write!(f, "{}M", minutes)?;
            }
            if seconds > 0 {
                write!(f, "{}S", seconds)?;
            }
        }
        Ok(())
    }
}

impl Serialize for IsoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IsoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
