//! Bank account endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use pfa_common::db::BankAccount;
use serde::Serialize;
use tracing::info;

use crate::db::bank_accounts::{self, BankAccountInput};
use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct BankAccountList {
    pub bank_accounts: Vec<BankAccount>,
    pub total_balance: f64,
}

/// GET /api/bank-accounts
pub async fn list_bank_accounts(State(state): State<AppState>) -> ApiResult<Json<BankAccountList>> {
    let bank_accounts = bank_accounts::list_bank_accounts(&state.db).await?;
    let total_balance = bank_accounts.iter().map(|a| a.amount).sum();
    Ok(Json(BankAccountList {
        bank_accounts,
        total_balance,
    }))
}

/// GET /api/bank-accounts/:id
pub async fn get_bank_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<BankAccount>> {
    bank_accounts::get_bank_account(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("bank account", id))
}

/// POST /api/bank-accounts
pub async fn create_bank_account(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BankAccountInput>,
) -> ApiResult<(StatusCode, Json<BankAccount>)> {
    let account = bank_accounts::create_bank_account(&state.db, &input).await?;
    info!(id = account.id, bank = %account.bank, "Bank account created");
    Ok((StatusCode::CREATED, Json(account)))
}

/// PUT /api/bank-accounts/:id
pub async fn update_bank_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<BankAccountInput>,
) -> ApiResult<Json<BankAccount>> {
    bank_accounts::update_bank_account(&state.db, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("bank account", id))
}

/// DELETE /api/bank-accounts/:id
pub async fn delete_bank_account(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<StatusCode> {
    if !bank_accounts::delete_bank_account(&state.db, id).await? {
        return Err(ApiError::not_found("bank account", id));
    }
    info!(id, "Bank account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn bank_account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bank-accounts", get(list_bank_accounts).post(create_bank_account))
        .route(
            "/api/bank-accounts/:id",
            get(get_bank_account)
                .put(update_bank_account)
                .delete(delete_bank_account),
        )
}
