//! pfa-web library interface
//!
//! Exposes the router and shared state so integration tests can drive the
//! service without binding a socket.

pub mod api;
pub mod db;
pub mod error;
pub mod extract;
pub mod services;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::services::{DocumentAnalyzer, Mailer, UploadStore};

/// Default request body ceiling for multipart uploads (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Where uploaded payslips, receipts and documents live
    pub uploads: UploadStore,
    /// Document extraction backend
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    /// Outbound email
    pub mailer: Arc<dyn Mailer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Whether `analyzer` is backed by a configured API key
    pub ai_configured: bool,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        uploads: UploadStore,
        analyzer: Arc<dyn DocumentAnalyzer>,
        mailer: Arc<dyn Mailer>,
        ai_configured: bool,
    ) -> Self {
        Self {
            db,
            uploads,
            analyzer,
            mailer,
            startup_time: Utc::now(),
            ai_configured,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::health_routes())
        .merge(api::pension_routes())
        .merge(api::bank_account_routes())
        .merge(api::payslip_routes())
        .merge(api::financial_year_routes())
        .merge(api::expense_routes())
        .merge(api::expense_report_routes())
        .merge(api::tax_return_routes())
        .merge(api::document_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
