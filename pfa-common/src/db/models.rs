//! Database models
//!
//! One struct per table row. Money is `f64` (SQLite `REAL`), dates are
//! `NaiveDate` (ISO text) and timestamps `DateTime<Utc>` (RFC 3339 text).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pension {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankAccount {
    pub id: i64,
    pub name: String,
    pub bank: String,
    /// Current balance
    pub amount: f64,
    /// Annual interest rate, percent
    pub interest_rate: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single payslip
///
/// `file_name` is unique: the same document cannot be imported twice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payslip {
    pub id: i64,
    pub file_name: String,
    pub pay_date: NaiveDate,
    /// `"YYYY/YY"` label derived from `pay_date`
    pub financial_year: String,
    pub employer: Option<String>,
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
    /// Uploaded document on disk, relative to the upload folder
    pub stored_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Cumulative year-to-date figures for one UK financial year
///
/// Holds the YTD values of the most recent payslip (by pay date) seen for the year.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinancialYearSummary {
    pub financial_year: String,
    pub last_pay_date: NaiveDate,
    pub gross_ytd: Option<f64>,
    pub tax_ytd: Option<f64>,
    pub ni_ytd: Option<f64>,
    pub pension_ytd: Option<f64>,
    pub net_ytd: Option<f64>,
    pub source_file_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: i64,
    pub vendor: String,
    pub expense_date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    /// One of `meals`, `travel`, `accommodation`, `other`
    pub category: String,
    pub description: Option<String>,
    /// Original receipt file name, when uploaded
    pub file_name: Option<String>,
    /// Receipt on disk, relative to the upload folder
    pub stored_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExpenseReport {
    pub id: i64,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Expense report with aggregate figures, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExpenseReportSummary {
    pub id: i64,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expense_count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaxReturn {
    pub id: i64,
    /// `"YYYY/YY"` label, unique
    pub financial_year: String,
    pub tax_charge: f64,
    pub deadline: Option<NaiveDate>,
    /// One of `not_started`, `in_progress`, `filed`, `paid`
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub file_name: String,
    pub doc_type: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Hex SHA-256 of the uploaded bytes
    pub sha256: String,
    pub stored_path: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentContent {
    pub document_id: i64,
    pub content: String,
    pub extracted_json: Option<String>,
    pub extracted_at: DateTime<Utc>,
}
