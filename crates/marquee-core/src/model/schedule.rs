use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{MarqueeError, Result};

/// Daily wall-clock window `[start, end)`
///
/// When `end` is earlier than `start` the window wraps past midnight, so
/// `22:00-06:00` covers the night shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Parse a pair of `HH:MM` strings
    ///
    /// # Errors
    /// `InvalidInput` if either bound is malformed or both bounds are equal.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = hhmm::parse(start)?;
        let end = hhmm::parse(end)?;
        if start == end {
            return Err(MarqueeError::invalid_input(
                "time window start and end must differ",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start < self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// When a redirect rule is eligible to fire
///
/// All set constraints must hold. `timezone` pins the wall-clock used for
/// `days_of_week` and `time_of_day`; without it the display's site timezone
/// applies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_from: Option<DateTime<Utc>>,

    /// Exclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_until: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<Weekday>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeWindow>,

    /// IANA timezone name, e.g. `Europe/Berlin`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Schedule {
    pub fn is_unconstrained(&self) -> bool {
        self.active_from.is_none()
            && self.active_until.is_none()
            && self.days_of_week.is_empty()
            && self.time_of_day.is_none()
    }
}

/// Serde adapter for `HH:MM` wall-clock strings
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::errors::{MarqueeError, Result};

    const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(raw.trim(), FORMAT).map_err(|_| {
            MarqueeError::invalid_input(format!("'{}' is not a HH:MM time", raw))
        })
    }

    pub fn serialize<S: Serializer>(
        time: &NaiveTime,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
