//! Lenient date parsing
//!
//! Dates arrive from HTML date inputs (`2024-05-31`) and from AI extraction of
//! UK documents, where day-first formats are the norm.

use chrono::NaiveDate;

use crate::{Error, Result};

/// Accepted formats, tried in order
///
/// Day-first numeric formats come before any month-first interpretation
/// because payslips and receipts are UK documents.
const FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%e %b %Y",
    "%e %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y/%m/%d",
];

/// Parse a date string in any of the accepted formats
///
/// Also accepts an RFC 3339 timestamp, keeping only its date part.
pub fn parse_flexible_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Date is empty".to_string()));
    }

    // "31st May 2024" -> "31 May 2024"
    let normalized = strip_ordinal_suffix(trimmed);

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Ok(date);
        }
    }

    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }

    Err(Error::InvalidInput(format!("Unrecognised date: {trimmed:?}")))
}

fn strip_ordinal_suffix(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            let suffix = &word[digits.len()..];
            let is_ordinal = !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && matches!(suffix.to_ascii_lowercase().as_str(), "st" | "nd" | "rd" | "th");
            if is_ordinal {
                digits
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse_flexible_date("2024-05-31").unwrap(), ymd(2024, 5, 31));
    }

    #[test]
    fn test_uk_numeric_dates_are_day_first() {
        assert_eq!(parse_flexible_date("03/04/2024").unwrap(), ymd(2024, 4, 3));
        assert_eq!(parse_flexible_date("03-04-2024").unwrap(), ymd(2024, 4, 3));
        assert_eq!(parse_flexible_date("03.04.2024").unwrap(), ymd(2024, 4, 3));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_flexible_date("5 Apr 2024").unwrap(), ymd(2024, 4, 5));
        assert_eq!(parse_flexible_date("28 February 2025").unwrap(), ymd(2025, 2, 28));
        assert_eq!(parse_flexible_date("31st May 2024").unwrap(), ymd(2024, 5, 31));
    }

    #[test]
    fn test_rfc3339_timestamp() {
        assert_eq!(
            parse_flexible_date("2024-06-01T09:30:00Z").unwrap(),
            ymd(2024, 6, 1)
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_flexible_date("").is_err());
        assert!(parse_flexible_date("not a date").is_err());
        assert!(parse_flexible_date("31/02/2024").is_err());
    }
}
