use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{
    assets, events, handlers, issuances, maintenance, middleware::metrics_middleware, repairs,
    tickets,
};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Event log
        .route("/events", get(events::query_events))
        // Assets
        .route("/assets", post(assets::register_asset))
        .route("/assets", get(assets::list_assets))
        .route("/assets/{id}", get(assets::get_asset))
        .route("/assets/barcode/{code}", get(assets::get_asset_by_barcode))
        .route("/assets/{id}/status", post(assets::set_asset_status))
        .route("/assets/{id}/dispose", post(assets::dispose_asset))
        .route("/assets/{id}/resolution", get(assets::get_asset_resolution))
        // Tickets
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/status", post(tickets::update_ticket_status))
        .route("/tickets/{id}/comments", post(tickets::add_comment))
        // Repairs
        .route("/repairs", post(repairs::open_repair))
        .route("/repairs", get(repairs::list_repairs))
        .route("/repairs/{id}", get(repairs::get_repair))
        .route("/repairs/{id}/diagnosis", post(repairs::record_diagnosis))
        .route("/repairs/{id}/complete", post(repairs::complete_repair))
        .route("/repairs/{id}/return", post(repairs::return_repair))
        // Issuances
        .route("/issuances", post(issuances::checkout))
        .route("/issuances", get(issuances::list_issuances))
        .route("/issuances/{id}", get(issuances::get_issuance))
        .route("/issuances/{id}/return", post(issuances::return_issuance))
        // Maintenance
        .route("/maintenance/reconcile", post(maintenance::reconcile));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
