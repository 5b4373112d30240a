//! Tax return endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use pfa_common::db::TaxReturn;
use tracing::info;

use crate::db::tax_returns::{self, TaxReturnInput};
use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, ApiResult, AppState};

/// GET /api/tax-returns
pub async fn list_tax_returns(State(state): State<AppState>) -> ApiResult<Json<Vec<TaxReturn>>> {
    Ok(Json(tax_returns::list_tax_returns(&state.db).await?))
}

/// GET /api/tax-returns/:id
pub async fn get_tax_return(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<TaxReturn>> {
    tax_returns::get_tax_return(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("tax return", id))
}

/// POST /api/tax-returns
///
/// One return per financial year; a second one for the same year is a 409.
pub async fn create_tax_return(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TaxReturnInput>,
) -> ApiResult<(StatusCode, Json<TaxReturn>)> {
    let tax_return = tax_returns::create_tax_return(&state.db, &input).await?;
    info!(id = tax_return.id, financial_year = %tax_return.financial_year, "Tax return created");
    Ok((StatusCode::CREATED, Json(tax_return)))
}

/// PUT /api/tax-returns/:id
pub async fn update_tax_return(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<TaxReturnInput>,
) -> ApiResult<Json<TaxReturn>> {
    tax_returns::update_tax_return(&state.db, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("tax return", id))
}

/// DELETE /api/tax-returns/:id
pub async fn delete_tax_return(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    if !tax_returns::delete_tax_return(&state.db, id).await? {
        return Err(ApiError::not_found("tax return", id));
    }
    info!(id, "Tax return deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn tax_return_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tax-returns", get(list_tax_returns).post(create_tax_return))
        .route(
            "/api/tax-returns/:id",
            get(get_tax_return).put(update_tax_return).delete(delete_tax_return),
        )
}
