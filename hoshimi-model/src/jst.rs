//! JST wall-clock time.
//!
//! Scheduling for the talent group is announced and consumed in Japan
//! Standard Time, so every instant in the domain is carried as a fixed
//! UTC+9 timestamp. A calendar day always means a JST calendar day.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const JST_OFFSET_SECS: i32 = 9 * 60 * 60;

fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

/// An instant pinned to the JST (UTC+9) wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JstTime(DateTime<FixedOffset>);

impl JstTime {
    /// The current instant in JST.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(t: DateTime<Utc>) -> Self {
        JstTime(t.with_timezone(&jst()))
    }

    /// Midnight at the start of the given JST calendar day.
    pub fn date(year: i32, month: u32, day: u32) -> Option<Self> {
        Self::datetime(year, month, day, 0, 0)
    }

    /// A JST instant with minute precision.
    pub fn datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
        jst().from_local_datetime(&naive).single().map(JstTime)
    }

    /// Truncate to midnight of the JST calendar day containing this instant.
    pub fn floor_to_day(self) -> Self {
        let naive = self
            .0
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists on every day");
        JstTime(
            jst()
                .from_local_datetime(&naive)
                .single()
                .expect("fixed offsets are never ambiguous"),
        )
    }

    pub fn add(self, d: Duration) -> Self {
        JstTime(self.0 + d)
    }

    pub fn add_days(self, n: i64) -> Self {
        self.add(Duration::days(n))
    }

    pub fn year(self) -> i32 {
        use chrono::Datelike;
        self.0.year()
    }

    pub fn month(self) -> u32 {
        use chrono::Datelike;
        self.0.month()
    }

    pub fn day(self) -> u32 {
        use chrono::Datelike;
        self.0.day()
    }

    pub fn hour(self) -> u32 {
        use chrono::Timelike;
        self.0.hour()
    }

    pub fn minute(self) -> u32 {
        use chrono::Timelike;
        self.0.minute()
    }

    /// The same instant as UTC, for storage.
    pub fn to_utc(self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    pub fn inner(self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl fmt::Display for JstTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// Announcements arrive with arbitrary offsets; re-anchor to JST on the way in
// so day-flooring and accessors always agree with the domain clock.
impl<'de> Deserialize<'de> for JstTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let t = DateTime::<FixedOffset>::deserialize(deserializer)?;
        Ok(JstTime(t.with_timezone(&jst())))
    }
}

/// A closed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub begin: JstTime,
    pub end: JstTime,
}

impl TimeRange {
    pub fn new(begin: JstTime, end: JstTime) -> Self {
        TimeRange { begin, end }
    }

    /// Whether the instant falls inside the interval, endpoints included.
    pub fn contains(&self, t: JstTime) -> bool {
        self.begin <= t && t <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_to_day_truncates_to_jst_midnight() {
        let t = JstTime::datetime(2024, 6, 14, 23, 45).unwrap();
        let floored = t.floor_to_day();
        assert_eq!(floored, JstTime::date(2024, 6, 14).unwrap());
        assert_eq!(floored.hour(), 0);
        assert_eq!(floored.minute(), 0);
    }

    #[test]
    fn floor_to_day_respects_jst_not_utc() {
        // 2024-06-14T20:00Z is already 2024-06-15 in JST.
        let utc = Utc.with_ymd_and_hms(2024, 6, 14, 20, 0, 0).unwrap();
        let t = JstTime::from_utc(utc);
        assert_eq!(t.floor_to_day(), JstTime::date(2024, 6, 15).unwrap());
    }

    #[test]
    fn range_contains_is_closed_on_both_ends() {
        let begin = JstTime::datetime(2024, 6, 14, 10, 0).unwrap();
        let end = JstTime::datetime(2024, 6, 14, 12, 0).unwrap();
        let r = TimeRange::new(begin, end);

        assert!(r.contains(begin));
        assert!(r.contains(end));
        assert!(r.contains(JstTime::datetime(2024, 6, 14, 11, 0).unwrap()));
        assert!(!r.contains(begin.add(-Duration::seconds(1))));
        assert!(!r.contains(end.add(Duration::seconds(1))));
    }

    #[test]
    fn deserialize_re_anchors_to_jst() {
        let t: JstTime = serde_json::from_str("\"2024-06-14T20:00:00Z\"").unwrap();
        assert_eq!(t.day(), 15);
        assert_eq!(t.hour(), 5);
    }
}
