//! Calendar-month arithmetic for monthly partitions.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        midnight_utc(self.start)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        midnight_utc(self.end)
    }

    /// True when `instant` falls inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start_utc() <= instant && instant < self.end_utc()
    }

    /// True when `other` lies entirely inside this range.
    pub fn covers(&self, other: &PeriodRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &PeriodRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    /// `month` is 1-based. Returns `None` outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self::from_date(instant.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month; December rolls over to January of the next year.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Shift by `months`, forwards or backwards.
    pub fn offset(&self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn start(&self) -> NaiveDate {
        // Day 1 of a validated month always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn end(&self) -> NaiveDate {
        self.next().start()
    }

    pub fn range(&self) -> PeriodRange {
        PeriodRange::new(self.start(), self.end())
    }

    /// `YYYY_MM`, used in partition names.
    pub fn suffix(&self) -> String {
        format!("{:04}_{:02}", self.year, self.month)
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn december_rolls_into_january() {
        let dec = MonthPeriod::new(2026, 12).unwrap();
        let jan = dec.next();
        assert_eq!((jan.year(), jan.month()), (2027, 1));
        assert_eq!(dec.end(), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn offset_backwards_across_years() {
        let feb = MonthPeriod::new(2026, 2).unwrap();
        assert_eq!(feb.offset(-3), MonthPeriod::new(2025, 11).unwrap());
        assert_eq!(feb.offset(-14), MonthPeriod::new(2024, 12).unwrap());
        assert_eq!(feb.offset(11), MonthPeriod::new(2027, 1).unwrap());
    }

    #[test]
    fn range_is_half_open() {
        let oct = MonthPeriod::new(2026, 10).unwrap().range();
        let last_moment = Utc.with_ymd_and_hms(2026, 10, 31, 23, 59, 59).unwrap();
        let next_month = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
        assert!(oct.contains(last_moment));
        assert!(!oct.contains(next_month));
    }

    #[test]
    fn rejects_month_zero_and_thirteen() {
        assert!(MonthPeriod::new(2026, 0).is_none());
        assert!(MonthPeriod::new(2026, 13).is_none());
    }
}
