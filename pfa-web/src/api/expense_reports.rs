//! Expense report endpoints
//!
//! Besides CRUD, a report can be exported as CSV, bundled into a ZIP with its
//! receipts, or mailed as that ZIP.

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use pfa_common::db::{Expense, ExpenseReport, ExpenseReportSummary};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::download;
use crate::db::expense_reports::{self, ReportInput};
use crate::extract::{ApiJson, ApiPath};
use crate::services::{export, MailAttachment, OutgoingMail};
use crate::validation::{optional_text, required_text};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: ExpenseReport,
    pub expenses: Vec<Expense>,
    pub total_amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    pub expense_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct AttachResponse {
    /// Ids newly linked; ids already on the report are not counted
    pub attached: usize,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub sent: bool,
    pub to: String,
    pub attachment: String,
}

/// GET /api/expense-reports
pub async fn list_reports(State(state): State<AppState>) -> ApiResult<Json<Vec<ExpenseReportSummary>>> {
    Ok(Json(expense_reports::list_reports(&state.db).await?))
}

/// GET /api/expense-reports/:id
pub async fn get_report(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<ReportDetail>> {
    let (report, expenses) = load_report(&state, id).await?;
    let total_amount = expenses.iter().map(|e| e.amount).sum();
    Ok(Json(ReportDetail {
        report,
        expenses,
        total_amount,
    }))
}

/// POST /api/expense-reports
pub async fn create_report(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ReportInput>,
) -> ApiResult<(StatusCode, Json<ExpenseReport>)> {
    let report = expense_reports::create_report(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// POST /api/expense-reports/:id/expenses
pub async fn attach_expenses(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<AttachRequest>,
) -> ApiResult<Json<AttachResponse>> {
    let attached = expense_reports::attach_expenses(&state.db, id, &request.expense_ids).await?;
    info!(report_id = id, attached, "Expenses attached to report");
    Ok(Json(AttachResponse { attached }))
}

/// DELETE /api/expense-reports/:id/expenses/:expense_id
pub async fn detach_expense(
    State(state): State<AppState>,
    ApiPath((id, expense_id)): ApiPath<(i64, i64)>,
) -> ApiResult<StatusCode> {
    if !expense_reports::detach_expense(&state.db, id, expense_id).await? {
        return Err(ApiError::NotFound(format!("expense {expense_id} on report {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/expense-reports/:id
///
/// Expenses referenced only by this report go with it, receipts included.
pub async fn delete_report(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    let removed = expense_reports::delete_report(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("expense report", id))?;

    for expense in &removed {
        state.uploads.remove_quietly(expense.stored_path.as_deref()).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/expense-reports/:id/export.csv
pub async fn export_csv(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Response> {
    let (report, expenses) = load_report(&state, id).await?;
    let csv = export::expense_report_csv(&expenses)?;
    let file_name = format!("{}.csv", export::slug(&report.name));
    Ok(download("text/csv; charset=utf-8", &file_name, csv))
}

/// GET /api/expense-reports/:id/export.zip
pub async fn export_zip(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Response> {
    let (file_name, bytes) = report_zip(&state, id).await?;
    Ok(download("application/zip", &file_name, bytes))
}

/// POST /api/expense-reports/:id/email
pub async fn email_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<EmailRequest>,
) -> ApiResult<Json<EmailResponse>> {
    if !state.mailer.is_configured() {
        return Err(ApiError::BadRequest("Email is not configured".to_string()));
    }
    let to = required_text("to", &request.to)?;

    let (file_name, bytes) = report_zip(&state, id).await?;
    let subject = optional_text(request.subject.as_deref())
        .unwrap_or_else(|| format!("Expense report: {}", file_name.trim_end_matches(".zip")));
    let body = optional_text(request.body.as_deref())
        .unwrap_or_else(|| "Please find the expense report and receipts attached.".to_string());

    state
        .mailer
        .send(OutgoingMail {
            to: to.clone(),
            subject,
            body,
            attachment: Some(MailAttachment {
                file_name: file_name.clone(),
                content_type: "application/zip".to_string(),
                bytes,
            }),
        })
        .await?;

    info!(report_id = id, to = %to, "Expense report emailed");
    Ok(Json(EmailResponse {
        sent: true,
        to,
        attachment: file_name,
    }))
}

async fn load_report(state: &AppState, id: i64) -> ApiResult<(ExpenseReport, Vec<Expense>)> {
    let report = expense_reports::get_report(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("expense report", id))?;
    let expenses = expense_reports::report_expenses(&state.db, id).await?;
    Ok((report, expenses))
}

/// Build `<slug>.zip` holding `<slug>.csv` and every receipt still on disk
async fn report_zip(state: &AppState, id: i64) -> ApiResult<(String, Vec<u8>)> {
    let (report, expenses) = load_report(state, id).await?;
    let slug = export::slug(&report.name);

    let mut entries = vec![(format!("{slug}.csv"), export::expense_report_csv(&expenses)?)];

    for expense in &expenses {
        let Some(stored) = expense.stored_path.as_deref() else {
            continue;
        };
        match state.uploads.read(stored).await {
            Ok(bytes) => entries.push((export::receipt_entry_name(expense), bytes)),
            Err(e) => warn!(expense_id = expense.id, path = %stored, error = %e, "Receipt missing from export"),
        }
    }

    let bytes = export::build_zip(&entries)?;
    Ok((format!("{slug}.zip"), bytes))
}

pub fn expense_report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/expense-reports", get(list_reports).post(create_report))
        .route("/api/expense-reports/:id", get(get_report).delete(delete_report))
        .route("/api/expense-reports/:id/expenses", post(attach_expenses))
        .route("/api/expense-reports/:id/expenses/:expense_id", delete(detach_expense))
        .route("/api/expense-reports/:id/export.csv", get(export_csv))
        .route("/api/expense-reports/:id/export.zip", get(export_zip))
        .route("/api/expense-reports/:id/email", post(email_report))
}
