//! CSV and ZIP export

use pfa_common::db::{Expense, Payslip};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::storage::sanitize_file_name;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn opt_money(value: Option<f64>) -> String {
    value.map(money).unwrap_or_default()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Expense report as CSV, one row per expense plus a closing `TOTAL` row
///
/// The total's currency column is filled only when every row shares one
/// currency.
pub fn expense_report_csv(expenses: &[Expense]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Date",
        "Vendor",
        "Category",
        "Description",
        "Amount",
        "Currency",
        "Receipt",
    ])?;

    for expense in expenses {
        writer.write_record([
            expense.expense_date.to_string(),
            expense.vendor.clone(),
            expense.category.clone(),
            expense.description.clone().unwrap_or_default(),
            money(expense.amount),
            expense.currency.clone(),
            expense.file_name.clone().unwrap_or_default(),
        ])?;
    }

    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    let currency = match expenses.first() {
        Some(first) if expenses.iter().all(|e| e.currency == first.currency) => first.currency.clone(),
        _ => String::new(),
    };
    writer.write_record([
        String::new(),
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        money(total),
        currency,
        String::new(),
    ])?;

    finish(writer)
}

pub fn payslips_csv(payslips: &[Payslip]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Pay Date",
        "Financial Year",
        "Employer",
        "Gross Pay",
        "Tax",
        "National Insurance",
        "Pension",
        "Other Deductions",
        "Net Pay",
        "Gross YTD",
        "Tax YTD",
        "NI YTD",
        "Pension YTD",
        "Net YTD",
        "File",
    ])?;

    for slip in payslips {
        writer.write_record([
            slip.pay_date.to_string(),
            slip.financial_year.clone(),
            slip.employer.clone().unwrap_or_default(),
            opt_money(slip.gross_pay),
            opt_money(slip.tax),
            opt_money(slip.national_insurance),
            opt_money(slip.pension),
            opt_money(slip.other_deductions),
            money(slip.net_pay),
            opt_money(slip.gross_ytd),
            opt_money(slip.tax_ytd),
            opt_money(slip.ni_ytd),
            opt_money(slip.pension_ytd),
            opt_money(slip.net_ytd),
            slip.file_name.clone(),
        ])?;
    }

    finish(writer)
}

/// Deflated ZIP archive from `(entry name, bytes)` pairs
pub fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Archive path of an expense's receipt, unique per expense
pub fn receipt_entry_name(expense: &Expense) -> String {
    let original = expense.file_name.as_deref().unwrap_or("receipt");
    format!(
        "receipts/{}-{}-{}",
        expense.expense_date,
        expense.id,
        sanitize_file_name(original)
    )
}

/// File-name friendly form of a report name
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if out.is_empty() {
        "report".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::io::Read;

    fn expense(id: i64, vendor: &str, amount: f64, currency: &str) -> Expense {
        Expense {
            id,
            vendor: vendor.to_string(),
            expense_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            amount,
            currency: currency.to_string(),
            category: "meals".to_string(),
            description: Some("Lunch, client".to_string()),
            file_name: Some("lunch.jpg".to_string()),
            stored_path: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_csv_has_total_row() {
        let csv = expense_report_csv(&[expense(1, "Pret", 8.5, "GBP"), expense(2, "Wasabi", 11.25, "GBP")])
            .unwrap();
        let text = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Date,Vendor"));
        // Embedded comma is quoted
        assert!(lines[1].contains("\"Lunch, client\""));
        assert_eq!(lines[3], ",TOTAL,,,19.75,GBP,");
    }

    #[test]
    fn test_mixed_currency_total_leaves_currency_blank() {
        let csv = expense_report_csv(&[expense(1, "A", 1.0, "GBP"), expense(2, "B", 2.0, "EUR")]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.lines().last().unwrap().ends_with(",3.00,,"));
    }

    #[test]
    fn test_empty_report_csv() {
        let text = String::from_utf8(expense_report_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_zip_round_trip() {
        let bytes = build_zip(&[
            ("report.csv".to_string(), b"a,b\n".to_vec()),
            ("receipts/x.jpg".to_string(), vec![1, 2, 3]),
        ])
        .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive.by_name("report.csv").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "a,b\n");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("March 2024: Client Visit!"), "march-2024-client-visit");
        assert_eq!(slug("  ***  "), "report");
    }

    #[test]
    fn test_receipt_entry_name() {
        assert_eq!(receipt_entry_name(&expense(7, "A", 1.0, "GBP")), "receipts/2024-06-01-7-lunch.jpg");
    }
}
