//! # Job triggers.
//!
//! A [`Trigger`] decides when a job fires:
//! - [`Trigger::Interval`]: every `d`, first fire one `d` after the job is added;
//! - [`Trigger::Cron`]: five-field cron expression evaluated in UTC.
//!
//! ## Cron syntax
//! ```text
//! ┌──────── minute        0-59
//! │ ┌────── hour          0-23
//! │ │ ┌──── day of month  1-31
//! │ │ │ ┌── month         1-12
//! │ │ │ │ ┌ day of week   0-6 (0 or 7 = Sunday)
//! * * * * *
//! ```
//! Each field is either `*` or a single integer. All concrete fields must
//! match (day-of-month and day-of-week are combined with AND). Malformed
//! expressions, and expressions that can never fire (`0 0 30 2 *`), are
//! configuration errors reported by [`CronSpec::parse`].
//!
//! ## Example
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use registry_keeper::CronSpec;
//!
//! let daily = CronSpec::parse("0 0 * * *").unwrap();
//! let after = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 12).unwrap();
//! assert_eq!(
//!     daily.next_after(after),
//!     Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()),
//! );
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};

use crate::error::ScheduleError;

/// How far ahead `next_after` searches; covers a full leap-year cycle.
const SEARCH_DAYS: u32 = 4 * 366;

/// When a job fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Fixed period.
    Interval(Duration),
    /// Calendar schedule.
    Cron(CronSpec),
}

impl Trigger {
    /// Interval trigger.
    pub fn every(period: Duration) -> Self {
        Trigger::Interval(period)
    }

    /// Cron trigger from a five-field expression.
    pub fn cron(expr: &str) -> Result<Self, ScheduleError> {
        CronSpec::parse(expr).map(Trigger::Cron)
    }

    /// Delay from `now` until the next fire, or `None` if it never fires again.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Trigger::Interval(period) => Some(*period),
            Trigger::Cron(spec) => {
                let next = spec.next_after(now)?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval(d) => write!(f, "every {d:?}"),
            Trigger::Cron(spec) => write!(f, "cron \"{spec}\""),
        }
    }
}

/// Parsed five-field cron expression; `None` means `*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CronSpec {
    minute: Option<u32>,
    hour: Option<u32>,
    day_of_month: Option<u32>,
    month: Option<u32>,
    day_of_week: Option<u32>,
}

impl CronSpec {
    /// Parses `minute hour day-of-month month day-of-week`.
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let invalid = |reason: String| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid(format!("expected 5 fields, got {}", fields.len())));
        }

        let field = |idx: usize, name: &str, min: u32, max: u32| -> Result<Option<u32>, ScheduleError> {
            let raw = fields[idx];
            if raw == "*" {
                return Ok(None);
            }
            let value: u32 = raw
                .parse()
                .map_err(|_| invalid(format!("{name} {raw:?} is neither '*' nor a number")))?;
            if value < min || value > max {
                return Err(invalid(format!("{name} {value} outside {min}-{max}")));
            }
            Ok(Some(value))
        };

        let spec = CronSpec {
            minute: field(0, "minute", 0, 59)?,
            hour: field(1, "hour", 0, 23)?,
            day_of_month: field(2, "day-of-month", 1, 31)?,
            month: field(3, "month", 1, 12)?,
            day_of_week: field(4, "day-of-week", 0, 7)?.map(|d| d % 7),
        };

        if spec.next_after(Utc::now()).is_none() {
            return Err(invalid("expression never fires".to_string()));
        }
        Ok(spec)
    }

    /// First whole minute strictly after `after` matching every field.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.with_second(0)?.with_nanosecond(0)? + TimeDelta::minutes(1);
        let first_day = start.date_naive();
        let midnight = NaiveTime::from_hms_opt(0, 0, 0)?;

        let mut day = first_day;
        for _ in 0..SEARCH_DAYS {
            if self.matches_day(day) {
                let from = if day == first_day { start.time() } else { midnight };
                if let Some(t) = self.first_time_from(from) {
                    return Some(day.and_time(t).and_utc());
                }
            }
            day = day.succ_opt()?;
        }
        None
    }

    fn matches_day(&self, day: NaiveDate) -> bool {
        matches(self.month, day.month())
            && matches(self.day_of_month, day.day())
            && matches(self.day_of_week, day.weekday().num_days_from_sunday())
    }

    fn first_time_from(&self, from: NaiveTime) -> Option<NaiveTime> {
        for hour in from.hour()..24 {
            if !matches(self.hour, hour) {
                continue;
            }
            let first_minute = if hour == from.hour() { from.minute() } else { 0 };
            if let Some(minute) = (first_minute..60).find(|m| matches(self.minute, *m)) {
                return NaiveTime::from_hms_opt(hour, minute, 0);
            }
        }
        None
    }
}

fn matches(field: Option<u32>, value: u32) -> bool {
    field.is_none_or(|f| f == value)
}

impl FromStr for CronSpec {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronSpec::parse(s)
    }
}

impl fmt::Display for CronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.minute,
            self.hour,
            self.day_of_month,
            self.month,
            self.day_of_week,
        ]
        .map(|p| p.map_or_else(|| "*".to_string(), |v| v.to_string()));
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = CronSpec::parse("0 0 * *").unwrap_err();
        assert_eq!(err.as_label(), "schedule_invalid_cron");
        assert!(CronSpec::parse("0 0 * * * *").is_err());
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!(CronSpec::parse("60 * * * *").is_err());
        assert!(CronSpec::parse("* 24 * * *").is_err());
        assert!(CronSpec::parse("* * 0 * *").is_err());
        assert!(CronSpec::parse("*/5 * * * *").is_err());
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(CronSpec::parse("0 0 30 2 *").is_err());
    }

    #[test]
    fn every_minute_fires_next_minute() {
        let spec = CronSpec::parse("* * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 15, 30).unwrap();
        assert_eq!(spec.next_after(after), Some(at(2024, 1, 1, 10, 16)));
    }

    #[test]
    fn fires_strictly_after_exact_match() {
        let spec = CronSpec::parse("30 9 * * *").unwrap();
        assert_eq!(spec.next_after(at(2024, 5, 1, 9, 30)), Some(at(2024, 5, 2, 9, 30)));
        assert_eq!(spec.next_after(at(2024, 5, 1, 9, 29)), Some(at(2024, 5, 1, 9, 30)));
    }

    #[test]
    fn day_of_week_seven_is_sunday() {
        let spec = CronSpec::parse("0 12 * * 7").unwrap();
        // 2024-06-05 is a Wednesday; next Sunday is the 9th.
        assert_eq!(spec.next_after(at(2024, 6, 5, 0, 0)), Some(at(2024, 6, 9, 12, 0)));
        assert_eq!(spec.to_string(), "0 12 * * 0");
    }

    #[test]
    fn leap_day_is_reachable() {
        let spec = CronSpec::parse("0 0 29 2 *").unwrap();
        assert_eq!(spec.next_after(at(2025, 3, 1, 0, 0)), Some(at(2028, 2, 29, 0, 0)));
    }

    #[test]
    fn interval_delay_is_the_period() {
        let t = Trigger::every(Duration::from_secs(5));
        assert_eq!(t.delay_from(Utc::now()), Some(Duration::from_secs(5)));
    }
}
