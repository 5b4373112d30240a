//! Per-entity database operations
//!
//! Schema and row models live in `pfa_common::db`; these modules hold the
//! queries the HTTP handlers run.

pub mod bank_accounts;
pub mod documents;
pub mod expense_reports;
pub mod expenses;
pub mod financial_years;
pub mod payslips;
pub mod pensions;
pub mod tax_returns;
