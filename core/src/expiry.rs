//! Expiry calculator.
//!
//! A policy expires at midnight UTC on its `end_date`, or twelve calendar
//! months after `start_date` when no end date is recorded. Days-to-expiry is
//! the ceiling of the remaining time in whole days, so anything still
//! expiring later today counts as 0 and yesterday's expiry counts as -1.

use chrono::{DateTime, Months, NaiveDate, NaiveTime, TimeZone, Utc};

/// Default policy term when no end date is recorded.
pub const DEFAULT_TERM_MONTHS: u32 = 12;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub date:           NaiveDate,
    pub days_to_expiry: i64,
}

impl Expiry {
    /// Still inside `[0, window_days]`.
    pub fn within_window(&self, window_days: u32) -> bool {
        (0..=i64::from(window_days)).contains(&self.days_to_expiry)
    }
}

/// Calendar-month arithmetic: same day-of-month, clamped to month end.
pub fn expiry_date(start_date: NaiveDate, end_date: Option<NaiveDate>) -> NaiveDate {
    end_date.unwrap_or_else(|| {
        start_date
            .checked_add_months(Months::new(DEFAULT_TERM_MONTHS))
            .unwrap_or(NaiveDate::MAX)
    })
}

pub fn days_to_expiry(expiry: NaiveDate, now: DateTime<Utc>) -> i64 {
    let expires_at = Utc.from_utc_datetime(&expiry.and_time(NaiveTime::default()));
    let remaining = (expires_at - now).num_milliseconds();
    let floor = remaining.div_euclid(MILLIS_PER_DAY);
    if remaining.rem_euclid(MILLIS_PER_DAY) == 0 {
        floor
    } else {
        floor + 1
    }
}

pub fn compute(start_date: NaiveDate, end_date: Option<NaiveDate>, now: DateTime<Utc>) -> Expiry {
    let date = expiry_date(start_date, end_date);
    Expiry {
        date,
        days_to_expiry: days_to_expiry(date, now),
    }
}
