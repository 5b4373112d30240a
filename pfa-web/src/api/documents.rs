//! Generic document endpoints
//!
//! Documents are stored as-is with a checksum. Extracted content is attached
//! separately through `PUT /api/documents/:id/content`.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use pfa_common::db::{Document, DocumentContent};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::db::documents::{self, DocumentWithContent, NewDocument};
use crate::extract::{ApiJson, ApiPath};
use crate::services::{collect_multipart, UploadResult, UploadedFile};
use crate::validation::optional_text;
use crate::{ApiError, ApiResult, AppState};

const UPLOAD_KIND: &str = "documents";
const DEFAULT_DOC_TYPE: &str = "other";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct DocumentUploadResponse {
    pub results: Vec<UploadResult>,
}

#[derive(Debug, Deserialize)]
pub struct ContentInput {
    pub content: String,
    #[serde(default)]
    pub extracted_json: Option<serde_json::Value>,
}

/// GET /api/documents
pub async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(documents::list_documents(&state.db).await?))
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<DocumentWithContent>> {
    documents::get_document(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("document", id))
}

/// POST /api/documents (multipart: one or more files, optional `doc_type`)
///
/// Each file is stored independently; a failure leaves no file or row behind
/// for that file and the rest of the batch carries on.
pub async fn upload_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<DocumentUploadResponse>> {
    let upload = collect_multipart(multipart).await?;
    if upload.files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }
    let doc_type = upload.field("doc_type").unwrap_or(DEFAULT_DOC_TYPE).to_lowercase();

    let mut results = Vec::with_capacity(upload.files.len());
    for file in &upload.files {
        results.push(store_document(&state, file, &doc_type).await);
    }

    info!(
        files = results.len(),
        succeeded = results.iter().filter(|r| r.id.is_some()).count(),
        "Document upload processed"
    );

    Ok(Json(DocumentUploadResponse { results }))
}

async fn store_document(state: &AppState, file: &UploadedFile, doc_type: &str) -> UploadResult {
    let name = file.file_name.as_str();
    if file.bytes.is_empty() {
        return UploadResult::error(name, "File is empty");
    }

    let stored_path = match state.uploads.save(UPLOAD_KIND, name, &file.bytes).await {
        Ok(path) => path,
        Err(e) => {
            warn!(file_name = %name, error = %e, "Failed to store document");
            return UploadResult::error(name, format!("Failed to store file: {e}"));
        }
    };

    let new = NewDocument {
        file_name: file.file_name.clone(),
        doc_type: doc_type.to_string(),
        mime_type: file.mime_type.clone().unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
        size_bytes: file.bytes.len() as i64,
        sha256: format!("{:x}", Sha256::digest(&file.bytes)),
        stored_path: Some(stored_path.clone()),
    };

    match documents::create_document(&state.db, &new).await {
        Ok(document) => {
            info!(id = document.id, file_name = %document.file_name, doc_type = %document.doc_type, "Document stored");
            UploadResult::success(name, document.id)
        }
        Err(e) => {
            warn!(file_name = %name, error = %e, "Failed to record document");
            state.uploads.remove_quietly(Some(&stored_path)).await;
            UploadResult::error(name, e.to_string())
        }
    }
}

/// PUT /api/documents/:id/content
pub async fn set_document_content(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ContentInput>,
) -> ApiResult<Json<DocumentContent>> {
    let extracted_json = input.extracted_json.as_ref().map(|v| v.to_string());
    let content = optional_text(Some(&input.content)).unwrap_or_default();

    documents::set_content(&state.db, id, &content, extracted_json.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("document", id))
}

/// DELETE /api/documents/:id
pub async fn delete_document(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    let document = documents::delete_document(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("document", id))?;

    state.uploads.remove_quietly(document.stored_path.as_deref()).await;
    info!(id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/api/documents", get(list_documents).post(upload_documents))
        .route("/api/documents/:id", get(get_document).delete(delete_document))
        .route("/api/documents/:id/content", put(set_document_content))
}
