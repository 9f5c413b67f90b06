//! Issuance API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use custodian_core::{Checkout, Issuance, IssuanceFilter, IssuanceStatus, ReturnAsset};

use super::error::ApiResult;
use super::middleware::ActingUser;
use super::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListIssuancesParams {
    pub asset_id: Option<String>,
    pub status: Option<IssuanceStatus>,
    /// Employee or department id
    pub recipient_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListIssuancesResponse {
    pub issuances: Vec<Issuance>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn checkout(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Json(body): Json<Checkout>,
) -> ApiResult<(StatusCode, Json<Issuance>)> {
    let issuance = state.lifecycle().issuances().checkout(&actor, body)?;
    Ok((StatusCode::CREATED, Json(issuance)))
}

pub async fn get_issuance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Issuance>> {
    Ok(Json(state.lifecycle().issuances().get(&id)?))
}

pub async fn list_issuances(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListIssuancesParams>,
) -> ApiResult<Json<ListIssuancesResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = IssuanceFilter::new();
    if let Some(asset_id) = params.asset_id {
        filter = filter.with_asset(asset_id);
    }
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    if let Some(recipient_id) = params.recipient_id {
        filter = filter.with_recipient(recipient_id);
    }

    let issuances = state.lifecycle().issuances();
    let total = issuances.count(&filter)?;
    let page = issuances.list(&filter.with_limit(limit).with_offset(offset))?;

    Ok(Json(ListIssuancesResponse {
        issuances: page,
        total,
        limit,
        offset,
    }))
}

pub async fn return_issuance(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<ReturnAsset>,
) -> ApiResult<Json<Issuance>> {
    let issuance = state
        .lifecycle()
        .issuances()
        .return_asset(&actor, &id, body)?;
    Ok(Json(issuance))
}
