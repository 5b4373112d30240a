//! Financial year endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use pfa_common::FinancialYear;
use serde::Serialize;
use tracing::info;

use crate::db::financial_years::{self, FinancialYearOverview};
use crate::extract::ApiPath;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    /// Number of summaries written
    pub summaries: usize,
}

/// GET /api/financial-years
pub async fn list_financial_years(State(state): State<AppState>) -> ApiResult<Json<Vec<FinancialYearOverview>>> {
    Ok(Json(financial_years::list_overviews(&state.db).await?))
}

/// GET /api/financial-years/:label
///
/// Accepts `2024-25` or the URL-encoded `2024%2F25`.
pub async fn get_financial_year(
    State(state): State<AppState>,
    ApiPath(label): ApiPath<String>,
) -> ApiResult<Json<FinancialYearOverview>> {
    let year: FinancialYear = label.parse()?;
    Ok(Json(financial_years::get_overview(&state.db, year).await?))
}

/// POST /api/financial-years/rebuild
pub async fn rebuild_financial_years(State(state): State<AppState>) -> ApiResult<Json<RebuildResponse>> {
    let summaries = financial_years::rebuild_summaries(&state.db).await?;
    info!(summaries, "Financial year summaries rebuilt");
    Ok(Json(RebuildResponse { summaries }))
}

pub fn financial_year_routes() -> Router<AppState> {
    Router::new()
        .route("/api/financial-years", get(list_financial_years))
        .route("/api/financial-years/rebuild", post(rebuild_financial_years))
        .route("/api/financial-years/:label", get(get_financial_year))
}
