//! Multipart upload collection and type detection

use axum::extract::Multipart;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ApiResult;

/// MIME types accepted for document uploads
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
];

/// One file part of a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// Detected from the bytes, not the client-supplied header
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime_type = detect_mime_type(&bytes).map(str::to_string);
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        }
    }

    /// Accepted MIME type, or a message suitable for a batch result row
    pub fn accepted_mime_type(&self) -> Result<&str, String> {
        if self.bytes.is_empty() {
            return Err("File is empty".to_string());
        }
        match self.mime_type.as_deref() {
            Some(mime) if ACCEPTED_MIME_TYPES.contains(&mime) => Ok(mime),
            Some(mime) => Err(format!("Unsupported file type: {mime}")),
            None => Err("Unrecognised file type".to_string()),
        }
    }
}

/// Outcome of one file in a batch upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadStatus {
    Success,
    Duplicate,
    Error,
}

/// Per-file row of a batch upload response
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub file_name: String,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payslips only: year the payslip was bucketed into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_year: Option<String>,
    /// Payslips only: what happened to the year's summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl UploadResult {
    pub fn success(file_name: &str, id: i64) -> Self {
        Self {
            file_name: file_name.to_string(),
            status: UploadStatus::Success,
            id: Some(id),
            message: None,
            financial_year: None,
            outcome: None,
        }
    }

    pub fn duplicate(file_name: &str, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            status: UploadStatus::Duplicate,
            id: None,
            message: Some(message.into()),
            financial_year: None,
            outcome: None,
        }
    }

    pub fn error(file_name: &str, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            status: UploadStatus::Error,
            id: None,
            message: Some(message.into()),
            financial_year: None,
            outcome: None,
        }
    }
}

/// Files and text fields of a multipart body, in arrival order
#[derive(Debug, Default)]
pub struct MultipartUpload {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartUpload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Drain a multipart body
///
/// Parts with a file name are files (whatever their field name); the rest are
/// text fields. A file part with a blank name is what a browser sends when no
/// file was chosen, and is dropped. Zero-byte files with a name are kept so
/// the batch can report them.
pub async fn collect_multipart(mut multipart: Multipart) -> ApiResult<MultipartUpload> {
    let mut upload = MultipartUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await?;
                if file_name.trim().is_empty() {
                    continue;
                }
                upload.files.push(UploadedFile::new(file_name, bytes.to_vec()));
            }
            None => {
                let text = field.text().await?;
                upload.fields.insert(name, text);
            }
        }
    }

    Ok(upload)
}

/// MIME type inferred from magic bytes
pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}
