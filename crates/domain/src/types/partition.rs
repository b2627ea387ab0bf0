//! Month/year partitions

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SteepleError};

/// The (month, year) scope patterns are computed and cached in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Partition {
    pub year: i32,
    /// 1 = January
    pub month: u32,
}

impl Partition {
    /// # Errors
    /// Returns [`SteepleError::InvalidInput`] for a month outside 1..=12 or a
    /// year outside 1970..=9999.
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SteepleError::InvalidInput(format!("month must be 1-12, got {month}")));
        }
        if !(1970..=9999).contains(&year) {
            return Err(SteepleError::InvalidInput(format!("year out of range: {year}")));
        }
        Ok(Self { year, month })
    }

    /// Partition containing a calendar date
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Partition containing `now` in the organisation timezone
    #[must_use]
    pub fn current(now: DateTime<Utc>, tz: Tz) -> Self {
        Self::containing(now.with_timezone(&tz).date_naive())
    }

    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// `count` consecutive partitions starting with `self`
    #[must_use]
    pub fn span(&self, count: u32) -> Vec<Self> {
        std::iter::successors(Some(*self), |p| Some(p.next())).take(count as usize).collect()
    }

    /// UTC bounds of the month in the organisation timezone, end exclusive
    #[must_use]
    pub fn window(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (local_midnight(tz, self.first_day()), local_midnight(tz, self.next().first_day()))
    }

    /// Whether an instant falls in this month, judged in the organisation
    /// timezone
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        Self::containing(instant.with_timezone(&tz).date_naive()) == *self
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// UTC instant of local midnight on `date`.
///
/// A midnight skipped by a DST jump resolves to the earliest valid local
/// instant after it.
#[must_use]
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest())
        .map_or_else(|| Utc.from_utc_datetime(&naive), |local| local.with_timezone(&Utc))
}
