// HTTP request handlers
use crate::application::poller::LiveStatus;
use crate::application::trip_controller::TripSnapshot;
use crate::domain::geo::{GeoError, GeoPoint};
use crate::domain::telemetry::TelemetrySample;
use crate::domain::trip::TripStats;
use crate::domain::vehicle::{MaintenanceRecord, Vehicle, VehicleId};
use crate::error::{BackendError, FleetError};
use crate::infrastructure::config::GpsSettings;
use crate::infrastructure::location_feed::LocationEvent;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Maps fleet failures onto status codes with a `{ "error": ... }` body
#[derive(Debug)]
pub struct ApiError(FleetError);

impl From<FleetError> for ApiError {
    fn from(e: FleetError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FleetError::NoActiveVehicle => StatusCode::CONFLICT,
            FleetError::MaintenanceIndex(_) => StatusCode::NOT_FOUND,
            FleetError::Backend(BackendError::Status { status: 404, .. }) => StatusCode::NOT_FOUND,
            FleetError::Backend(_) => StatusCode::BAD_GATEWAY,
            FleetError::Store(_) | FleetError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SelectVehicle {
    pub vehicle_id: VehicleId,
}

#[derive(Debug, Serialize)]
pub struct ActiveVehicle {
    pub vehicle_id: Option<VehicleId>,
    pub vehicle: Option<Vehicle>,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub vehicle_id: VehicleId,
}

#[derive(Debug, Deserialize)]
pub struct LocationErrorReport {
    pub error: GeoError,
}

#[derive(Debug, Serialize)]
pub struct Delivery {
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct TripEnded {
    pub ended: bool,
    pub stats: Option<TripStats>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn live_status(State(state): State<Arc<AppState>>) -> Json<LiveStatus> {
    Json(state.live.borrow().clone())
}

pub async fn trip_status(State(state): State<Arc<AppState>>) -> Result<Json<TripSnapshot>, StatusCode> {
    state
        .controller
        .snapshot()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

pub async fn trip_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TelemetrySample>>, StatusCode> {
    state
        .controller
        .history()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// Manual end. Answers `ended: false` when no trip was active.
pub async fn end_trip(State(state): State<Arc<AppState>>) -> Json<TripEnded> {
    let stats = state.controller.end_trip().await;
    Json(TripEnded {
        ended: stats.is_some(),
        stats,
    })
}

/// Watch options for whatever bridges device geolocation into `/gps`
pub async fn gps_options(State(state): State<Arc<AppState>>) -> Json<GpsSettings> {
    Json(state.gps_settings.clone())
}

/// A fix is only accepted while a trip has the location watch open
pub async fn post_location(
    State(state): State<Arc<AppState>>,
    Json(point): Json<GeoPoint>,
) -> Json<Delivery> {
    let accepted = state.location_feed.publish(LocationEvent::Fix(point));
    tracing::debug!(accepted, lat = point.latitude, lon = point.longitude, "Location fix received");
    Json(Delivery { accepted })
}

pub async fn post_location_error(
    State(state): State<Arc<AppState>>,
    Json(report): Json<LocationErrorReport>,
) -> Json<Delivery> {
    let accepted = state.location_feed.publish(LocationEvent::Error(report.error));
    Json(Delivery { accepted })
}

pub async fn list_vehicles(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Vehicle>> {
    Ok(Json(state.fleet.list_vehicles().await?))
}

pub async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(vehicle): Json<Vehicle>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let vehicle_id = state.fleet.create_vehicle(&vehicle).await?;
    Ok((StatusCode::CREATED, Json(Created { vehicle_id })))
}

pub async fn get_vehicle(
    Path(id): Path<VehicleId>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vehicle> {
    Ok(Json(state.fleet.get_vehicle(id).await?))
}

pub async fn update_vehicle(
    Path(id): Path<VehicleId>,
    State(state): State<Arc<AppState>>,
    Json(vehicle): Json<Vehicle>,
) -> Result<StatusCode, ApiError> {
    state.fleet.update_vehicle(id, &vehicle).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_vehicle(
    Path(id): Path<VehicleId>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.fleet.delete_vehicle(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_active_vehicle(State(state): State<Arc<AppState>>) -> Json<ActiveVehicle> {
    Json(ActiveVehicle {
        vehicle_id: state.fleet.active_vehicle_id(),
        vehicle: state.fleet.active_vehicle_info(),
    })
}

pub async fn select_active_vehicle(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectVehicle>,
) -> ApiResult<ActiveVehicle> {
    let vehicle = state.fleet.select_active(body.vehicle_id).await?;
    Ok(Json(ActiveVehicle {
        vehicle_id: Some(body.vehicle_id),
        vehicle: Some(vehicle),
    }))
}

pub async fn clear_active_vehicle(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.fleet.clear_active().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_vehicle_draft(State(state): State<Arc<AppState>>) -> Json<Option<Vehicle>> {
    Json(state.fleet.vehicle_form())
}

pub async fn save_vehicle_draft(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<Vehicle>,
) -> Result<StatusCode, ApiError> {
    state.fleet.save_vehicle_form(&draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_maintenance(State(state): State<Arc<AppState>>) -> Json<Vec<MaintenanceRecord>> {
    Json(state.fleet.maintenance_history())
}

pub async fn add_maintenance(
    State(state): State<Arc<AppState>>,
    Json(record): Json<MaintenanceRecord>,
) -> ApiResult<Vec<MaintenanceRecord>> {
    Ok(Json(state.fleet.add_maintenance(record).await?))
}

pub async fn remove_maintenance(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<MaintenanceRecord>> {
    Ok(Json(state.fleet.remove_maintenance(index).await?))
}
