//! HTTP API handlers
//!
//! One module per resource; each exposes a `*_routes()` builder merged by
//! [`crate::build_router`].

pub mod bank_accounts;
pub mod documents;
pub mod expense_reports;
pub mod expenses;
pub mod financial_years;
pub mod health;
pub mod payslips;
pub mod pensions;
pub mod tax_returns;
pub mod ui;

pub use bank_accounts::bank_account_routes;
pub use documents::document_routes;
pub use expense_reports::expense_report_routes;
pub use expenses::expense_routes;
pub use financial_years::financial_year_routes;
pub use health::health_routes;
pub use payslips::payslip_routes;
pub use pensions::pension_routes;
pub use tax_returns::tax_return_routes;
pub use ui::ui_routes;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

/// File download response with a `Content-Disposition: attachment` header
pub(crate) fn download(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
