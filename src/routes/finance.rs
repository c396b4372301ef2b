//! Household ledger. Every handler takes [`AdminUser`], so only the configured
//! administrator gets past the extractor.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    ledger::{FinanceReport, NetWorth},
    middleware::admin::AdminUser,
    models::finance::{
        Asset, CreateAssetRequest, CreateTransactionRequest, ReportQuery, Transaction,
        TransactionQuery, UpdateAssetRequest, UpdateTransactionRequest,
    },
    services::finance::FinanceService,
    AppState,
};

pub async fn list_transactions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Vec<Transaction>>> {
    Ok(Json(FinanceService::list_transactions(&state.db, &query).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(body): Json<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let tx = FinanceService::create_transaction(&state.db, &user.email, &body).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTransactionRequest>,
) -> AppResult<Json<Transaction>> {
    FinanceService::update_transaction(&state.db, id, &body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Transaction"))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if FinanceService::delete_transaction(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Transaction"))
    }
}

pub async fn list_assets(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Json<Vec<Asset>>> {
    Ok(Json(FinanceService::list_assets(&state.db).await?))
}

pub async fn create_asset(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateAssetRequest>,
) -> AppResult<(StatusCode, Json<Asset>)> {
    let asset = FinanceService::create_asset(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn update_asset(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAssetRequest>,
) -> AppResult<Json<Asset>> {
    FinanceService::update_asset(&state.db, id, &body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Asset"))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if FinanceService::delete_asset(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Asset"))
    }
}

pub async fn report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<FinanceReport>> {
    Ok(Json(FinanceService::report(&state.db, &query).await?))
}

pub async fn net_worth(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Json<NetWorth>> {
    Ok(Json(FinanceService::net_worth(&state.db).await?))
}
