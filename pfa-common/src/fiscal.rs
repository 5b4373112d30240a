//! UK financial (tax) year arithmetic
//!
//! A UK tax year runs from 6 April to 5 April of the following calendar year.
//! Years are identified by the calendar year they start in and are labelled
//! `"YYYY/YY"`, e.g. 6 April 2024 – 5 April 2025 is `"2024/25"`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Month in which a UK tax year starts
const START_MONTH: u32 = 4;
/// Day of [`START_MONTH`] on which a UK tax year starts
const START_DAY: u32 = 6;

/// A UK financial year, identified by its starting calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    /// Financial year starting on 6 April of `start_year`
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Bucket a date into its financial year
    pub fn containing(date: NaiveDate) -> Self {
        let on_or_after_start = (date.month(), date.day()) >= (START_MONTH, START_DAY);
        let start_year = if on_or_after_start {
            date.year()
        } else {
            date.year() - 1
        };
        Self { start_year }
    }

    /// Calendar year the financial year starts in
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// First day (6 April), inclusive
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, START_MONTH, START_DAY)
            .unwrap_or(NaiveDate::MIN)
    }

    /// Last day (5 April of the following year), inclusive
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year + 1, START_MONTH, START_DAY - 1)
            .unwrap_or(NaiveDate::MAX)
    }

    /// Whether `date` falls inside this financial year
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// The following financial year
    pub fn next(&self) -> Self {
        Self::starting(self.start_year + 1)
    }

    /// The preceding financial year
    pub fn previous(&self) -> Self {
        Self::starting(self.start_year - 1)
    }

    /// `"YYYY/YY"` label used as the storage key
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl FromStr for FinancialYear {
    type Err = Error;

    /// Parse `"2024/25"` or `"2024-25"`
    ///
    /// The two-digit suffix must be the year after the start year.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("Invalid financial year label: {s:?}"));

        let trimmed = s.trim();
        let (start, end) = trimmed
            .split_once(['/', '-'])
            .ok_or_else(invalid)?;

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if start.len() != 4 || end.len() != 2 || !all_digits(start) || !all_digits(end) {
            return Err(invalid());
        }

        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let suffix: i32 = end.parse().map_err(|_| invalid())?;

        if (start_year + 1).rem_euclid(100) != suffix {
            return Err(invalid());
        }

        Ok(Self { start_year })
    }
}

impl Serialize for FinancialYear {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FinancialYear {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sixth_of_april_starts_new_year() {
        assert_eq!(FinancialYear::containing(date(2024, 4, 6)).label(), "2024/25");
    }

    #[test]
    fn test_fifth_of_april_ends_previous_year() {
        assert_eq!(FinancialYear::containing(date(2024, 4, 5)).label(), "2023/24");
    }

    #[test]
    fn test_january_belongs_to_year_started_previous_april() {
        assert_eq!(FinancialYear::containing(date(2025, 1, 31)).label(), "2024/25");
    }

    #[test]
    fn test_december_belongs_to_current_start_year() {
        assert_eq!(FinancialYear::containing(date(2024, 12, 25)).label(), "2024/25");
    }

    #[test]
    fn test_century_rollover_label() {
        assert_eq!(FinancialYear::starting(1999).label(), "1999/00");
        assert_eq!("1999/00".parse::<FinancialYear>().unwrap().start_year(), 1999);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let fy = FinancialYear::starting(2023);
        assert_eq!(fy.start_date(), date(2023, 4, 6));
        assert_eq!(fy.end_date(), date(2024, 4, 5));
        assert!(fy.contains(date(2023, 4, 6)));
        assert!(fy.contains(date(2024, 4, 5)));
        assert!(!fy.contains(date(2024, 4, 6)));
        assert!(!fy.contains(date(2023, 4, 5)));
    }

    #[test]
    fn test_parse_accepts_slash_and_dash() {
        assert_eq!("2024/25".parse::<FinancialYear>().unwrap(), FinancialYear::starting(2024));
        assert_eq!("2024-25".parse::<FinancialYear>().unwrap(), FinancialYear::starting(2024));
        assert_eq!(" 2024/25 ".parse::<FinancialYear>().unwrap(), FinancialYear::starting(2024));
    }

    #[test]
    fn test_parse_rejects_mismatched_suffix() {
        assert!("2024/26".parse::<FinancialYear>().is_err());
        assert!("2024".parse::<FinancialYear>().is_err());
        assert!("24/25".parse::<FinancialYear>().is_err());
        assert!("abcd/ef".parse::<FinancialYear>().is_err());
    }

    #[test]
    fn test_parse_rejects_signed_years() {
        assert!("+999/00".parse::<FinancialYear>().is_err());
        assert!("2024/+5".parse::<FinancialYear>().is_err());

        // Every accepted label must format back to itself
        let fy: FinancialYear = "1999/00".parse().unwrap();
        assert_eq!(fy.label(), "1999/00");
    }

    #[test]
    fn test_next_and_previous() {
        let fy = FinancialYear::starting(2024);
        assert_eq!(fy.next().label(), "2025/26");
        assert_eq!(fy.previous().label(), "2023/24");
    }

    #[test]
    fn test_serde_uses_label() {
        let json = serde_json::to_string(&FinancialYear::starting(2022)).unwrap();
        assert_eq!(json, "\"2022/23\"");
        let back: FinancialYear = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FinancialYear::starting(2022));
    }
}
