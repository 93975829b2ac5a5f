// Presentation layer - HTTP status API
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/live", get(live_status))
        .route("/trip", get(trip_status))
        .route("/trip/history", get(trip_history))
        .route("/trip/end", post(end_trip))
        .route("/gps", get(gps_options).post(post_location))
        .route("/gps/error", post(post_location_error))
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/active",
            get(get_active_vehicle)
                .put(select_active_vehicle)
                .delete(clear_active_vehicle),
        )
        .route("/vehicles/draft", get(get_vehicle_draft).put(save_vehicle_draft))
        .route(
            "/vehicles/:id",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route("/maintenance", get(list_maintenance).post(add_maintenance))
        .route("/maintenance/:index", delete(remove_maintenance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
