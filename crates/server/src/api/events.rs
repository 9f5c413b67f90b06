use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use custodian_core::{EventFilter, EventRecord};

use super::error::{ApiError, ApiResult};
use super::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

/// Query parameters for the event log
#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    /// Filter by asset ID
    pub asset_id: Option<String>,
    /// Filter by ticket ID
    pub ticket_id: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by acting user
    pub actor_id: Option<String>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EventQueryResponse {
    /// Matching events, newest first
    pub events: Vec<EventRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn store_failure(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %e, "{}", context);
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store",
        format!("{}: {}", context, e),
    )
}

/// Query the lifecycle event log
pub async fn query_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventQueryParams>,
) -> ApiResult<Json<EventQueryResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    // Shared between query and count
    let mut base_filter = EventFilter::new();

    if let Some(ref asset_id) = params.asset_id {
        base_filter = base_filter.with_asset_id(asset_id);
    }

    if let Some(ref ticket_id) = params.ticket_id {
        base_filter = base_filter.with_ticket_id(ticket_id);
    }

    if let Some(ref event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }

    if let Some(ref actor_id) = params.actor_id {
        base_filter = base_filter.with_actor_id(actor_id);
    }

    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let query_filter = EventFilter {
        limit,
        offset,
        ..base_filter.clone()
    };

    let events = state
        .event_store()
        .query(&query_filter)
        .map_err(|e| store_failure("Failed to query events", e))?;

    let total = state
        .event_store()
        .count(&base_filter)
        .map_err(|e| store_failure("Failed to count events", e))?;

    Ok(Json(EventQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
