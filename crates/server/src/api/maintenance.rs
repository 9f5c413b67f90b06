use axum::{extract::State, Json};
use std::sync::Arc;

use custodian_core::ReconcileReport;

use super::error::ApiResult;
use super::middleware::ActingUser;
use crate::state::AppState;

/// Run the reconciliation pass on demand.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
) -> ApiResult<Json<ReconcileReport>> {
    tracing::info!(actor_id = %actor.id, role = %actor.role, "Reconciliation requested");
    let report = state.lifecycle().reconciler().run()?;
    Ok(Json(report))
}
