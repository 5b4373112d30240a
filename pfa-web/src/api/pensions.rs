//! Pension endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use pfa_common::db::Pension;
use serde::Serialize;
use tracing::info;

use crate::db::pensions::{self, PensionInput};
use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct PensionList {
    pub pensions: Vec<Pension>,
    pub total_amount: f64,
}

/// GET /api/pensions
pub async fn list_pensions(State(state): State<AppState>) -> ApiResult<Json<PensionList>> {
    let pensions = pensions::list_pensions(&state.db).await?;
    let total_amount = pensions.iter().map(|p| p.amount).sum();
    Ok(Json(PensionList { pensions, total_amount }))
}

/// GET /api/pensions/:id
pub async fn get_pension(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Pension>> {
    pensions::get_pension(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("pension", id))
}

/// POST /api/pensions
pub async fn create_pension(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PensionInput>,
) -> ApiResult<(StatusCode, Json<Pension>)> {
    let pension = pensions::create_pension(&state.db, &input).await?;
    info!(id = pension.id, name = %pension.name, "Pension created");
    Ok((StatusCode::CREATED, Json(pension)))
}

/// PUT /api/pensions/:id
pub async fn update_pension(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<PensionInput>,
) -> ApiResult<Json<Pension>> {
    pensions::update_pension(&state.db, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("pension", id))
}

/// DELETE /api/pensions/:id
pub async fn delete_pension(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    if !pensions::delete_pension(&state.db, id).await? {
        return Err(ApiError::not_found("pension", id));
    }
    info!(id, "Pension deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn pension_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pensions", get(list_pensions).post(create_pension))
        .route(
            "/api/pensions/:id",
            get(get_pension).put(update_pension).delete(delete_pension),
        )
}
