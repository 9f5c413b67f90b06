//! Asset API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use custodian_core::{Asset, AssetFilter, AssetStatus, NewAsset, Resolution};

use super::error::ApiResult;
use super::middleware::ActingUser;
use super::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

/// Query parameters for listing assets
#[derive(Debug, Deserialize)]
pub struct ListAssetsParams {
    pub status: Option<AssetStatus>,
    pub department_id: Option<String>,
    pub category_id: Option<String>,
    /// Maximum number of assets to return (default 100, max 1000)
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListAssetsResponse {
    pub assets: Vec<Asset>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for an explicit status change
#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    pub status: AssetStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for disposal
#[derive(Debug, Deserialize)]
pub struct DisposeBody {
    pub reason: String,
}

/// What the synchronizer would do with the asset right now.
#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub asset_id: String,
    pub current: AssetStatus,
    pub resolution: Resolution,
    pub resolved: AssetStatus,
}

pub async fn register_asset(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Json(body): Json<NewAsset>,
) -> ApiResult<(StatusCode, Json<Asset>)> {
    let asset = state.lifecycle().registry().register(&actor, body)?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAssetsParams>,
) -> ApiResult<Json<ListAssetsResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = AssetFilter::new();
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    if let Some(department_id) = params.department_id {
        filter = filter.with_department(department_id);
    }
    if let Some(category_id) = params.category_id {
        filter = filter.with_category(category_id);
    }

    let registry = state.lifecycle().registry();
    let total = registry.count(&filter)?;
    let assets = registry.list(&filter.with_limit(limit).with_offset(offset))?;

    Ok(Json(ListAssetsResponse {
        assets,
        total,
        limit,
        offset,
    }))
}

pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Asset>> {
    Ok(Json(state.lifecycle().registry().find(&id)?))
}

pub async fn get_asset_by_barcode(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<Asset>> {
    Ok(Json(state.lifecycle().registry().find_by_barcode(&code)?))
}

pub async fn set_asset_status(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<SetStatusBody>,
) -> ApiResult<Json<Asset>> {
    let reason = body.reason.unwrap_or_else(|| "manual".to_string());
    let asset = state
        .lifecycle()
        .registry()
        .set_status(&actor, &id, body.status, &reason)?;
    Ok(Json(asset))
}

pub async fn dispose_asset(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<DisposeBody>,
) -> ApiResult<Json<Asset>> {
    let asset = state
        .lifecycle()
        .registry()
        .dispose(&actor, &id, &body.reason)?;
    Ok(Json(asset))
}

pub async fn get_asset_resolution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResolutionResponse>> {
    let lifecycle = state.lifecycle();
    let current = lifecycle.registry().find(&id)?.status;
    let resolution = lifecycle.synchronizer().resolve_asset_status(&id, None)?;

    Ok(Json(ResolutionResponse {
        asset_id: id,
        current,
        resolution,
        resolved: resolution.status_from(current),
    }))
}
