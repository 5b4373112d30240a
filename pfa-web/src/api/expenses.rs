//! Expense endpoints

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use pfa_common::db::{Expense, ExpenseReport};
use pfa_common::ExpenseCategory;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::expense_reports::{self, ReportInput};
use crate::db::expenses::{self, ExpenseFilter, ExpenseInput, NewExpense};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::extraction::extract_receipt;
use crate::services::{collect_multipart, UploadResult, UploadedFile};
use crate::validation::optional_text;
use crate::{ApiError, ApiResult, AppState};

const UPLOAD_KIND: &str = "receipts";

#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub unreported: bool,
}

impl ExpenseQuery {
    fn filter(&self) -> ApiResult<ExpenseFilter> {
        let category = optional_text(self.category.as_deref())
            .map(|c| c.parse::<ExpenseCategory>())
            .transpose()?;
        Ok(ExpenseFilter {
            category,
            unreported: self.unreported,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptUploadResponse {
    pub results: Vec<UploadResult>,
    /// Report created over the successful rows when `report_name` was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ExpenseReport>,
    /// Why the report could not be created; the expenses above are kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
}

/// GET /api/expenses?category=&unreported=
pub async fn list_expenses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ExpenseQuery>,
) -> ApiResult<Json<Vec<Expense>>> {
    let filter = query.filter()?;
    Ok(Json(expenses::list_expenses(&state.db, filter).await?))
}

/// GET /api/expenses/:id
pub async fn get_expense(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Expense>> {
    expenses::get_expense(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("expense", id))
}

/// POST /api/expenses
pub async fn create_expense(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ExpenseInput>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let new = input.validate()?;
    let expense = expenses::create_expense(&state.db, &new).await?;
    info!(id = expense.id, vendor = %expense.vendor, category = %expense.category, "Expense created");
    Ok((StatusCode::CREATED, Json(expense)))
}

/// PUT /api/expenses/:id
pub async fn update_expense(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ExpenseInput>,
) -> ApiResult<Json<Expense>> {
    let new = input.validate()?;
    expenses::update_expense(&state.db, id, &new)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("expense", id))
}

/// DELETE /api/expenses/:id
pub async fn delete_expense(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    let expense = expenses::delete_expense(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("expense", id))?;

    state.uploads.remove_quietly(expense.stored_path.as_deref()).await;
    info!(id, "Expense deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/expenses/upload (multipart receipts, optional `report_name`)
pub async fn upload_receipts(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ReceiptUploadResponse>> {
    let upload = collect_multipart(multipart).await?;
    if upload.files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let mut results = Vec::with_capacity(upload.files.len());
    for file in &upload.files {
        results.push(process_receipt(&state, file).await);
    }

    let created: Vec<i64> = results.iter().filter_map(|r| r.id).collect();

    let (report, report_error) = match upload.field("report_name") {
        Some(name) if !created.is_empty() => {
            let input = ReportInput {
                name: name.to_string(),
                notes: upload.field("report_notes").map(str::to_string),
                expense_ids: created.clone(),
            };
            match expense_reports::create_report(&state.db, &input).await {
                Ok(report) => (Some(report), None),
                Err(e) => {
                    warn!(report_name = %name, error = %e, "Failed to create report for uploaded receipts");
                    (None, Some(format!("Failed to create report: {e}")))
                }
            }
        }
        _ => (None, None),
    };

    info!(
        files = results.len(),
        succeeded = created.len(),
        report_id = report.as_ref().map(|r| r.id),
        "Receipt upload processed"
    );

    Ok(Json(ReceiptUploadResponse {
        results,
        report,
        report_error,
    }))
}

async fn process_receipt(state: &AppState, file: &UploadedFile) -> UploadResult {
    let name = file.file_name.as_str();

    if let Err(message) = file.accepted_mime_type() {
        return UploadResult::error(name, message);
    }

    let data = match extract_receipt(state.analyzer.as_ref(), file).await {
        Ok(data) => data,
        Err(e) => {
            warn!(file_name = %name, error = %e, "Receipt extraction failed");
            return UploadResult::error(name, e.to_string());
        }
    };

    let stored_path = match state.uploads.save(UPLOAD_KIND, name, &file.bytes).await {
        Ok(path) => path,
        Err(e) => return UploadResult::error(name, format!("Failed to store file: {e}")),
    };

    let created = match NewExpense::from_receipt(data, name, Some(stored_path.clone())) {
        Ok(new) => expenses::create_expense(&state.db, &new).await,
        Err(e) => Err(e),
    };

    match created {
        Ok(expense) => UploadResult::success(name, expense.id),
        Err(e) => {
            state.uploads.remove_quietly(Some(&stored_path)).await;
            UploadResult::error(name, e.to_string())
        }
    }
}

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/expenses/upload", post(upload_receipts))
        .route(
            "/api/expenses/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}
