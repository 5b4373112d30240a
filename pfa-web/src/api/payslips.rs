//! Payslip endpoints
//!
//! Uploads are processed one file at a time. Each file gets its own result
//! row; a failure on one file never aborts the rest of the batch.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use pfa_common::db::Payslip;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::download;
use crate::db::financial_years::UpsertOutcome;
use crate::db::payslips::{self, NewPayslip, PayslipInput};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::extraction::extract_payslip;
use crate::services::{collect_multipart, export, UploadResult, UploadedFile};
use crate::validation::financial_year_label;
use crate::{ApiError, ApiResult, AppState};

/// Folder under the uploads root for payslip files
const UPLOAD_KIND: &str = "payslips";

#[derive(Debug, Deserialize)]
pub struct PayslipQuery {
    pub financial_year: Option<String>,
}

impl PayslipQuery {
    fn label(&self) -> ApiResult<Option<String>> {
        match self.financial_year.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(financial_year_label(raw)?)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordedPayslip {
    pub payslip: Payslip,
    pub outcome: UpsertOutcome,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub results: Vec<UploadResult>,
}

/// GET /api/payslips?financial_year=
pub async fn list_payslips(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PayslipQuery>,
) -> ApiResult<Json<Vec<Payslip>>> {
    let label = query.label()?;
    Ok(Json(payslips::list_payslips(&state.db, label.as_deref()).await?))
}

/// GET /api/payslips/:id
pub async fn get_payslip(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Payslip>> {
    payslips::get_payslip(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("payslip", id))
}

/// POST /api/payslips
///
/// Manual entry. Goes through the same upsert-if-newer path as uploads.
pub async fn create_payslip(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PayslipInput>,
) -> ApiResult<(StatusCode, Json<RecordedPayslip>)> {
    let new = input.validate()?;
    let (payslip, outcome) = payslips::record_payslip(&state.db, &new).await?;
    Ok((StatusCode::CREATED, Json(RecordedPayslip { payslip, outcome })))
}

/// POST /api/payslips/upload (multipart, one or more files)
pub async fn upload_payslips(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload = collect_multipart(multipart).await?;
    if upload.files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let mut results = Vec::with_capacity(upload.files.len());
    for file in &upload.files {
        results.push(process_upload(&state, file).await);
    }

    info!(
        files = results.len(),
        succeeded = results.iter().filter(|r| r.id.is_some()).count(),
        "Payslip upload processed"
    );

    Ok(Json(UploadResponse { results }))
}

async fn process_upload(state: &AppState, file: &UploadedFile) -> UploadResult {
    let name = file.file_name.as_str();

    if let Err(message) = file.accepted_mime_type() {
        return UploadResult::error(name, message);
    }

    match payslips::payslip_exists(&state.db, name).await {
        Ok(true) => return UploadResult::duplicate(name, "Payslip already uploaded"),
        Ok(false) => {}
        Err(e) => return UploadResult::error(name, e.to_string()),
    }

    let data = match extract_payslip(state.analyzer.as_ref(), file).await {
        Ok(data) => data,
        Err(e) => {
            warn!(file_name = %name, error = %e, "Payslip extraction failed");
            return UploadResult::error(name, e.to_string());
        }
    };

    let stored_path = match state.uploads.save(UPLOAD_KIND, name, &file.bytes).await {
        Ok(path) => path,
        Err(e) => return UploadResult::error(name, format!("Failed to store file: {e}")),
    };

    let recorded = match NewPayslip::from_extracted(name, data, Some(stored_path.clone())) {
        Ok(new) => payslips::record_payslip(&state.db, &new).await,
        Err(e) => Err(e),
    };

    match recorded {
        Ok((payslip, outcome)) => {
            let mut result = UploadResult::success(name, payslip.id);
            result.financial_year = Some(payslip.financial_year);
            result.outcome = Some(format!("{outcome:?}"));
            result
        }
        Err(e) => {
            state.uploads.remove_quietly(Some(&stored_path)).await;
            match e {
                pfa_common::Error::Conflict(msg) => UploadResult::duplicate(name, msg),
                other => UploadResult::error(name, other.to_string()),
            }
        }
    }
}

/// DELETE /api/payslips/:id
///
/// The year's summary keeps its figures until `POST /api/financial-years/rebuild`.
pub async fn delete_payslip(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    let payslip = payslips::delete_payslip(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("payslip", id))?;

    state.uploads.remove_quietly(payslip.stored_path.as_deref()).await;
    info!(id, file_name = %payslip.file_name, "Payslip deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/payslips/export.csv?financial_year=
pub async fn export_payslips(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PayslipQuery>,
) -> ApiResult<Response> {
    let label = query.label()?;
    let rows = payslips::list_payslips(&state.db, label.as_deref()).await?;
    let csv = export::payslips_csv(&rows)?;

    let file_name = match &label {
        Some(l) => format!("payslips-{}.csv", l.replace('/', "-")),
        None => "payslips.csv".to_string(),
    };
    Ok(download("text/csv; charset=utf-8", &file_name, csv))
}

pub fn payslip_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payslips", get(list_payslips).post(create_payslip))
        .route("/api/payslips/upload", post(upload_payslips))
        .route("/api/payslips/export.csv", get(export_payslips))
        .route("/api/payslips/:id", get(get_payslip).delete(delete_payslip))
}
