//! Calendar rules: weekly-with-exclusion and monthly-last-weekday.
//!
//! All computation happens in one fixed zone, Indian Standard Time
//! (UTC+05:30). IST has no daylight saving, so a `FixedOffset` is exact.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

use super::{JobDescriptor, RecurrenceRule, ScheduleError};

/// Offset of the dashboard's fixed zone from UTC, in seconds.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The fixed zone all schedules are evaluated in.
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is within range")
}

/// Parse a weekday name such as `"friday"` or `"Fri"`.
pub fn parse_weekday(s: &str) -> Result<Weekday, ScheduleError> {
    Weekday::from_str(s).map_err(|_| ScheduleError::UnknownWeekday(s.to_string()))
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// The last date in `year`/`month` that falls on `weekday`.
///
/// Takes the month's final date (day before the first of the following
/// month) and steps back `(last.weekday - weekday) mod 7` days.
pub fn last_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
) -> Result<NaiveDate, ScheduleError> {
    if !(1..=12).contains(&month) {
        return Err(ScheduleError::InvalidMonth { year, month });
    }
    let (next_year, next_month) = following_month(year, month);
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .ok_or(ScheduleError::InvalidMonth { year, month })?;

    let back = (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    Ok(last - Duration::days(i64::from(back)))
}

/// Computes next fire instants for the dashboard's recurring jobs.
///
/// Both calendar rules share one target weekday and one time of day. The
/// calculator holds no mutable state and can be shared freely across tasks.
#[derive(Debug, Clone)]
pub struct ScheduleCalculator {
    weekday: Weekday,
    time: NaiveTime,
    zone: FixedOffset,
}

impl Default for ScheduleCalculator {
    /// Friday at 21:50 IST (16:20 UTC).
    fn default() -> Self {
        Self {
            weekday: Weekday::Fri,
            time: NaiveTime::from_hms_opt(21, 50, 0).expect("21:50 is valid"),
            zone: ist(),
        }
    }
}

impl ScheduleCalculator {
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(ScheduleError::InvalidTime { hour, minute })?;
        Ok(Self {
            weekday,
            time,
            zone: ist(),
        })
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// `date` at the configured time of day, in the fixed zone.
    fn at(&self, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        let local = date.and_time(self.time);
        let utc = local.checked_sub_signed(Duration::seconds(i64::from(
            self.zone.local_minus_utc(),
        )))?;
        Some(DateTime::from_naive_utc_and_offset(utc, self.zone))
    }

    /// The date reserved for the monthly rule in `date`'s month.
    fn excluded_in_month_of(&self, date: NaiveDate) -> Option<NaiveDate> {
        last_weekday_of_month(date.year(), date.month(), self.weekday).ok()
    }

    /// Last target weekday of the current month at the fixed time, or of the
    /// following month once that instant is no longer in the future.
    ///
    /// `None` only when the answer lies beyond the range chrono can represent.
    pub fn next_monthly_run(&self, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        let today = now.with_timezone(&self.zone).date_naive();

        if let Some(this_month) = self.at(self.excluded_in_month_of(today)?) {
            if this_month > now {
                return Some(this_month);
            }
        }

        let (year, month) = following_month(today.year(), today.month());
        let next = last_weekday_of_month(year, month, self.weekday).ok()?;
        self.at(next)
    }

    /// Next target weekday at the fixed time, skipping the last one of its
    /// month.
    ///
    /// `None` only when the answer lies beyond the range chrono can represent.
    pub fn next_weekly_run(&self, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        let today = now.with_timezone(&self.zone).date_naive();

        let days_ahead = if today.weekday() == self.weekday
            && (self.at(today).map_or(true, |fire| now >= fire)
                || Some(today) == self.excluded_in_month_of(today))
        {
            7
        } else {
            let target = i64::from(self.weekday.num_days_from_monday());
            let current = i64::from(today.weekday().num_days_from_monday());
            (target - current).rem_euclid(7)
        };

        // The offset alone can land on the excluded date, so check the candidate.
        let mut candidate = today.checked_add_signed(Duration::days(days_ahead))?;
        if candidate == self.excluded_in_month_of(candidate)? {
            candidate = candidate.checked_add_signed(Duration::days(7))?;
        }
        self.at(candidate)
    }

    /// Next run for `job`, or `None` when the job is inactive, has no rule
    /// and no externally supplied time, or runs past the representable range.
    pub fn next_run_for(
        &self,
        job: &JobDescriptor,
        now: DateTime<Utc>,
    ) -> Option<DateTime<FixedOffset>> {
        if !job.active {
            return None;
        }
        match job.rule {
            RecurrenceRule::WeeklyExcludeLast => self.next_weekly_run(now),
            RecurrenceRule::MonthlyLastWeekday => self.next_monthly_run(now),
            RecurrenceRule::Unspecified => job.next_run.map(|at| at.with_timezone(&self.zone)),
        }
    }

    /// The next `count` fire instants for `job`, earliest first.
    pub fn upcoming(
        &self,
        job: &JobDescriptor,
        now: DateTime<Utc>,
        count: usize,
    ) -> Vec<DateTime<FixedOffset>> {
        if job.rule == RecurrenceRule::Unspecified {
            return self
                .next_run_for(job, now)
                .into_iter()
                .take(count)
                .collect();
        }

        let mut runs = Vec::with_capacity(count);
        let mut cursor = now;
        while runs.len() < count {
            let Some(next) = self.next_run_for(job, cursor) else {
                break;
            };
            cursor = next.with_timezone(&Utc);
            runs.push(next);
        }
        runs
    }

    /// Human-readable rendering of `rule`, e.g. "Monthly on the last Friday at 21:50 IST".
    pub fn describe(&self, rule: RecurrenceRule) -> String {
        let day = weekday_name(self.weekday);
        let time = self.time.format("%H:%M");
        match rule {
            RecurrenceRule::WeeklyExcludeLast => {
                format!("Weekly on {day} at {time} IST (except last {day} of the month)")
            }
            RecurrenceRule::MonthlyLastWeekday => {
                format!("Monthly on the last {day} at {time} IST")
            }
            RecurrenceRule::Unspecified => "Externally scheduled".to_string(),
        }
    }
}
