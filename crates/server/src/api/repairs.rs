//! Repair API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use custodian_core::{CompleteRepair, OpenRepair, RepairFilter, RepairOutcome, RepairRecord};

use super::error::ApiResult;
use super::middleware::ActingUser;
use super::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRepairsParams {
    pub ticket_id: Option<String>,
    pub asset_id: Option<String>,
    pub outcome: Option<RepairOutcome>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListRepairsResponse {
    pub repairs: Vec<RepairRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosisBody {
    pub diagnosis: String,
}

pub async fn open_repair(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Json(body): Json<OpenRepair>,
) -> ApiResult<(StatusCode, Json<RepairRecord>)> {
    let repair = state.lifecycle().repairs().open_repair(&actor, body)?;
    Ok((StatusCode::CREATED, Json(repair)))
}

pub async fn get_repair(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RepairRecord>> {
    Ok(Json(state.lifecycle().repairs().get(&id)?))
}

pub async fn list_repairs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRepairsParams>,
) -> ApiResult<Json<ListRepairsResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = RepairFilter::new();
    if let Some(ticket_id) = params.ticket_id {
        filter = filter.with_ticket(ticket_id);
    }
    if let Some(asset_id) = params.asset_id {
        filter = filter.with_asset(asset_id);
    }
    if let Some(outcome) = params.outcome {
        filter = filter.with_outcome(outcome);
    }

    let repairs = state.lifecycle().repairs();
    let total = repairs.count(&filter)?;
    let page = repairs.list(&filter.with_limit(limit).with_offset(offset))?;

    Ok(Json(ListRepairsResponse {
        repairs: page,
        total,
        limit,
        offset,
    }))
}

pub async fn record_diagnosis(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<DiagnosisBody>,
) -> ApiResult<Json<RepairRecord>> {
    let repair = state
        .lifecycle()
        .repairs()
        .record_diagnosis(&actor, &id, &body.diagnosis)?;
    Ok(Json(repair))
}

pub async fn complete_repair(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<CompleteRepair>,
) -> ApiResult<Json<RepairRecord>> {
    let repair = state.lifecycle().repairs().complete(&actor, &id, body)?;
    Ok(Json(repair))
}

pub async fn return_repair(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Json<RepairRecord>> {
    let repair = state
        .lifecycle()
        .repairs()
        .mark_returned_to_user(&actor, &id)?;
    Ok(Json(repair))
}
