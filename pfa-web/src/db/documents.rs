//! Generic document metadata and extracted content

use chrono::Utc;
use pfa_common::db::{Document, DocumentContent};
use pfa_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// A document row ready to insert
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub file_name: String,
    pub doc_type: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub stored_path: Option<String>,
}

/// Document with its extracted content, if any
#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithContent {
    #[serde(flatten)]
    pub document: Document,
    pub content: Option<DocumentContent>,
}

pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<Document>> {
    let rows = sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY uploaded_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_document(pool: &SqlitePool, id: i64) -> Result<Option<DocumentWithContent>> {
    let Some(document) = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let content = sqlx::query_as::<_, DocumentContent>("SELECT * FROM document_contents WHERE document_id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(Some(DocumentWithContent { document, content }))
}

pub async fn create_document(pool: &SqlitePool, new: &NewDocument) -> Result<Document> {
    let row = sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents (file_name, doc_type, mime_type, size_bytes, sha256, stored_path, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&new.file_name)
    .bind(&new.doc_type)
    .bind(&new.mime_type)
    .bind(new.size_bytes)
    .bind(&new.sha256)
    .bind(&new.stored_path)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Insert or replace the extracted content of a document
///
/// Returns `None` when the document does not exist.
pub async fn set_content(
    pool: &SqlitePool,
    document_id: i64,
    content: &str,
    extracted_json: Option<&str>,
) -> Result<Option<DocumentContent>> {
    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?)")
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Ok(None);
    }

    let row = sqlx::query_as::<_, DocumentContent>(
        r#"
        INSERT INTO document_contents (document_id, content, extracted_json, extracted_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(document_id) DO UPDATE SET
            content = excluded.content,
            extracted_json = excluded.extracted_json,
            extracted_at = excluded.extracted_at
        RETURNING *
        "#,
    )
    .bind(document_id)
    .bind(content)
    .bind(extracted_json)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(row))
}

/// Delete a document (content cascades), returning the removed row
pub async fn delete_document(pool: &SqlitePool, id: i64) -> Result<Option<Document>> {
    let row = sqlx::query_as::<_, Document>("DELETE FROM documents WHERE id = ? RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
