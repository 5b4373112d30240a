//! Structured data extraction from receipts and payslips
//!
//! The model is asked for a flat JSON object. Answers are read leniently:
//! the object may be wrapped in prose or a ```json fence, money may arrive as
//! `"£1,234.50"`, and dates in any format `parse_flexible_date` accepts.

use chrono::NaiveDate;
use pfa_common::dates::parse_flexible_date;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::ai_client::{AiError, DocumentAnalyzer};
use super::uploads::UploadedFile;

pub const RECEIPT_PROMPT: &str = r#"You are reading a receipt or invoice.
Return a single JSON object with these keys:
  "vendor": merchant name (string),
  "date": transaction date as YYYY-MM-DD (string),
  "amount": total amount paid including tax (number),
  "currency": ISO 4217 code, e.g. "GBP" (string),
  "description": short summary of what was bought (string or null).
Return only the JSON object."#;

pub const PAYSLIP_PROMPT: &str = r#"You are reading a UK payslip.
Return a single JSON object with these keys (numbers without currency symbols, null when absent):
  "employer": employer name (string or null),
  "pay_date": payment date as YYYY-MM-DD (string),
  "net_pay": net pay for this period (number),
  "gross_pay": gross pay for this period,
  "tax": income tax (PAYE) for this period,
  "national_insurance": employee national insurance for this period,
  "pension": employee pension contribution for this period,
  "other_deductions": any other deductions for this period,
  "gross_ytd": taxable gross pay year to date,
  "tax_ytd": tax paid year to date,
  "ni_ytd": national insurance year to date,
  "pension_ytd": pension contributions year to date,
  "net_ytd": net pay year to date.
Return only the JSON object."#;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("No JSON object in AI response")]
    NoJson,

    #[error("Invalid JSON in AI response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field in AI response: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field} in AI response: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Fields read from a receipt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptData {
    pub vendor: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
}

/// Fields read from a payslip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayslipData {
    pub employer: Option<String>,
    pub pay_date: NaiveDate,
    pub net_pay: f64,
    pub gross_pay: Option<f64>,
    pub tax: Option<f64>,
    pub national_insurance: Option<f64>,
    pub pension: Option<f64>,
    pub other_deductions: Option<f64>,
    pub gross_ytd: Option<f64>,
    pub tax_ytd: Option<f64>,
    pub ni_ytd: Option<f64>,
    pub pension_ytd: Option<f64>,
    pub net_ytd: Option<f64>,
}

pub async fn extract_receipt(
    analyzer: &dyn DocumentAnalyzer,
    document: &UploadedFile,
) -> Result<ReceiptData, ExtractionError> {
    let answer = analyzer.analyze(RECEIPT_PROMPT, document).await?;
    parse_receipt(&answer)
}

pub async fn extract_payslip(
    analyzer: &dyn DocumentAnalyzer,
    document: &UploadedFile,
) -> Result<PayslipData, ExtractionError> {
    let answer = analyzer.analyze(PAYSLIP_PROMPT, document).await?;
    parse_payslip(&answer)
}

pub fn parse_receipt(answer: &str) -> Result<ReceiptData, ExtractionError> {
    let obj = json_object(answer)?;

    Ok(ReceiptData {
        vendor: text(&obj, "vendor").ok_or(ExtractionError::MissingField("vendor"))?,
        date: date(&obj, "date")?,
        amount: money(&obj, "amount")?.ok_or(ExtractionError::MissingField("amount"))?,
        currency: text(&obj, "currency")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "GBP".to_string()),
        description: text(&obj, "description"),
    })
}

pub fn parse_payslip(answer: &str) -> Result<PayslipData, ExtractionError> {
    let obj = json_object(answer)?;

    Ok(PayslipData {
        employer: text(&obj, "employer"),
        pay_date: date(&obj, "pay_date")?,
        net_pay: money(&obj, "net_pay")?.ok_or(ExtractionError::MissingField("net_pay"))?,
        gross_pay: money(&obj, "gross_pay")?,
        tax: money(&obj, "tax")?,
        national_insurance: money(&obj, "national_insurance")?,
        pension: money(&obj, "pension")?,
        other_deductions: money(&obj, "other_deductions")?,
        gross_ytd: money(&obj, "gross_ytd")?,
        tax_ytd: money(&obj, "tax_ytd")?,
        ni_ytd: money(&obj, "ni_ytd")?,
        pension_ytd: money(&obj, "pension_ytd")?,
        net_ytd: money(&obj, "net_ytd")?,
    })
}

/// First `{ ... }` span of the answer, parsed as a JSON object
fn json_object(answer: &str) -> Result<Map<String, Value>, ExtractionError> {
    let start = answer.find('{').ok_or(ExtractionError::NoJson)?;
    let end = answer.rfind('}').ok_or(ExtractionError::NoJson)?;
    if end < start {
        return Err(ExtractionError::NoJson);
    }

    match serde_json::from_str::<Value>(&answer[start..=end])? {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractionError::NoJson),
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn date(obj: &Map<String, Value>, key: &'static str) -> Result<NaiveDate, ExtractionError> {
    let raw = text(obj, key).ok_or(ExtractionError::MissingField(key))?;
    parse_flexible_date(&raw).map_err(|_| ExtractionError::InvalidField {
        field: key,
        value: raw,
    })
}

fn money(obj: &Map<String, Value>, key: &'static str) -> Result<Option<f64>, ExtractionError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => parse_money(s).map_err(|_| ExtractionError::InvalidField {
            field: key,
            value: s.clone(),
        }),
        Some(other) => Err(ExtractionError::InvalidField {
            field: key,
            value: other.to_string(),
        }),
    }
}

/// Money string that does not read as a UK-formatted amount
#[derive(Debug, Error)]
#[error("Unrecognised money amount: {0:?}")]
pub struct MoneyFormatError(pub String);

/// Parse `"£1,234.50"`, `"1234.5 GBP"`, `"(12.00)"` and the like
///
/// Blank strings are absent values. Parenthesised amounts are negative.
/// Commas are thousands separators; a comma after the last dot
/// (`"1.234,56"`) is a decimal comma and is rejected.
pub fn parse_money(raw: &str) -> Result<Option<f64>, MoneyFormatError> {
    let trimmed = raw.trim();
    let invalid = || MoneyFormatError(raw.to_string());

    if let (Some(comma), Some(dot)) = (trimmed.rfind(','), trimmed.rfind('.')) {
        if comma > dot {
            return Err(invalid());
        }
    }

    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let value: f64 = cleaned.parse().map_err(|_| invalid())?;
    Ok(Some(if negative { -value } else { value }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_from_fenced_answer() {
        let answer = "Here you go:\n```json\n{\"vendor\": \"Pret A Manger\", \"date\": \"12/03/2024\", \
                      \"amount\": \"£8.45\", \"currency\": \"gbp\", \"description\": \"\"}\n```";
        let receipt = parse_receipt(answer).unwrap();

        assert_eq!(receipt.vendor, "Pret A Manger");
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(receipt.amount, 8.45);
        assert_eq!(receipt.currency, "GBP");
        assert_eq!(receipt.description, None);
    }

    #[test]
    fn test_receipt_defaults_currency() {
        let receipt = parse_receipt(r#"{"vendor":"Trainline","date":"2024-01-02","amount":54.1}"#).unwrap();
        assert_eq!(receipt.currency, "GBP");
    }

    #[test]
    fn test_receipt_missing_amount() {
        let err = parse_receipt(r#"{"vendor":"X","date":"2024-01-02"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingField("amount")));
    }

    #[test]
    fn test_payslip_with_string_numbers() {
        let answer = r#"{
            "employer": "Acme Ltd",
            "pay_date": "28 March 2025",
            "net_pay": "2,345.67",
            "gross_pay": 3200,
            "tax": "£410.20",
            "national_insurance": null,
            "gross_ytd": "38,400.00",
            "net_ytd": "28,148.04"
        }"#;
        let slip = parse_payslip(answer).unwrap();

        assert_eq!(slip.pay_date, NaiveDate::from_ymd_opt(2025, 3, 28).unwrap());
        assert_eq!(slip.net_pay, 2345.67);
        assert_eq!(slip.gross_pay, Some(3200.0));
        assert_eq!(slip.tax, Some(410.20));
        assert_eq!(slip.national_insurance, None);
        assert_eq!(slip.pension, None);
        assert_eq!(slip.gross_ytd, Some(38400.0));
    }

    #[test]
    fn test_payslip_bad_date() {
        let err = parse_payslip(r#"{"pay_date":"sometime","net_pay":1}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidField { field: "pay_date", .. }));
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(parse_receipt("I cannot read this image"), Err(ExtractionError::NoJson)));
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("£1,234.50").unwrap(), Some(1234.5));
        assert_eq!(parse_money("(12.00)").unwrap(), Some(-12.0));
        assert_eq!(parse_money(" ").unwrap(), None);
        assert!(parse_money("1.2.3").is_err());
    }

    #[test]
    fn test_parse_money_rejects_decimal_comma() {
        assert!(parse_money("1.234,56").is_err());
        assert_eq!(parse_money("1,234.56").unwrap(), Some(1234.56));

        let err = parse_payslip(r#"{"pay_date":"2024-05-31","net_pay":"1.234,56"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidField { field: "net_pay", .. }));
    }
}
