//! Request field validation helpers

use chrono::NaiveDate;
use pfa_common::dates::parse_flexible_date;
use pfa_common::{Error, FinancialYear, Result};

/// Trimmed, non-blank text
pub fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed text, with blank treated as absent
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Finite amount (rejects NaN and infinities)
pub fn finite_amount(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::InvalidInput(format!("{field} must be a finite number")));
    }
    Ok(value)
}

/// Optional finite amount
pub fn optional_amount(field: &str, value: Option<f64>) -> Result<Option<f64>> {
    value.map(|v| finite_amount(field, v)).transpose()
}

/// Required date in any accepted format
pub fn required_date(field: &str, value: &str) -> Result<NaiveDate> {
    parse_flexible_date(value)
        .map_err(|e| Error::InvalidInput(format!("{field}: {e}")))
}

/// Optional date; blank is absent
pub fn optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    optional_text(value)
        .map(|v| required_date(field, &v))
        .transpose()
}

/// Financial year label normalised to `"YYYY/YY"`
pub fn financial_year_label(value: &str) -> Result<String> {
    Ok(value.parse::<FinancialYear>()?.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("name", "  ISA  ").unwrap(), "ISA");
        assert!(required_text("name", "   ").is_err());
    }

    #[test]
    fn test_optional_text_blank_is_none() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn test_finite_amount() {
        assert!(finite_amount("amount", 12.5).is_ok());
        assert!(finite_amount("amount", f64::NAN).is_err());
        assert!(finite_amount("amount", f64::INFINITY).is_err());
    }

    #[test]
    fn test_financial_year_label_normalises_separator() {
        assert_eq!(financial_year_label("2023-24").unwrap(), "2023/24");
        assert!(financial_year_label("2023-25").is_err());
    }

    #[test]
    fn test_optional_date_blank_is_none() {
        assert_eq!(optional_date("deadline", Some("")).unwrap(), None);
        assert!(optional_date("deadline", Some("soon")).is_err());
    }
}
