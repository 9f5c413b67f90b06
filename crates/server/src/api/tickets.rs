//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use custodian_core::{Comment, NewTicket, Ticket, TicketFilter, TicketStatus};

use super::error::ApiResult;
use super::middleware::ActingUser;
use super::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

/// Request body for opening a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    #[serde(flatten)]
    pub ticket: NewTicket,
    /// Asset the ticket is about, if any
    #[serde(default)]
    pub asset_id: Option<String>,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    pub status: Option<TicketStatus>,
    pub asset_id: Option<String>,
    pub assignee_id: Option<String>,
    pub reporter_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for a status change
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: TicketStatus,
    /// Assigning an open ticket moves it to in_progress
    #[serde(default)]
    pub assignee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub text: String,
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Json(body): Json<CreateTicketBody>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let ticket = state
        .lifecycle()
        .tickets()
        .create(&actor, body.ticket, body.asset_id.as_deref())?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Ticket>> {
    Ok(Json(state.lifecycle().tickets().get(&id)?))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> ApiResult<Json<ListTicketsResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new();
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    if let Some(asset_id) = params.asset_id {
        filter = filter.with_asset(asset_id);
    }
    if let Some(assignee_id) = params.assignee_id {
        filter = filter.with_assignee(assignee_id);
    }
    if let Some(reporter_id) = params.reporter_id {
        filter = filter.with_reporter(reporter_id);
    }

    let tickets = state.lifecycle().tickets();
    let total = tickets.count(&filter)?;
    let page = tickets.list(&filter.with_limit(limit).with_offset(offset))?;

    Ok(Json(ListTicketsResponse {
        tickets: page,
        total,
        limit,
        offset,
    }))
}

pub async fn update_ticket_status(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state
        .lifecycle()
        .tickets()
        .update_status(&actor, &id, body.status, body.assignee_id)?;
    Ok(Json(ticket))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .lifecycle()
        .tickets()
        .add_comment(&actor, &id, &body.text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}
