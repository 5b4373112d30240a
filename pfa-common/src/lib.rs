//! # PFA Common Library
//!
//! Shared code for the personal finance administration service:
//! - Error and result types
//! - Bootstrap configuration (TOML / environment / defaults)
//! - UK financial-year arithmetic
//! - Lenient date parsing for extracted documents
//! - Expense categorisation
//! - Database schema and row models

pub mod categories;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod fiscal;

pub use categories::ExpenseCategory;
pub use error::{Error, Result};
pub use fiscal::FinancialYear;
