// Backend trait for fleet, trip and live telemetry access
use crate::domain::telemetry::{LiveReading, TripDataPoint};
use crate::domain::trip::{TripId, TripStats};
use crate::domain::vehicle::{Vehicle, VehicleId};
use crate::error::BackendError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait FleetBackend: Send + Sync {
    /// Read the current OBD telemetry
    async fn fetch_live_data(&self) -> Result<LiveReading, BackendError>;

    /// Open a server-side trip and return its id
    async fn start_trip(
        &self,
        vehicle_id: VehicleId,
        start_time: DateTime<Utc>,
    ) -> Result<TripId, BackendError>;

    /// Upload a batch of trip records, returning how many the backend stored
    async fn push_trip_data(
        &self,
        trip_id: TripId,
        points: &[TripDataPoint],
    ) -> Result<usize, BackendError>;

    /// Close a server-side trip with its final aggregates
    async fn stop_trip(&self, trip_id: TripId, stats: &TripStats) -> Result<(), BackendError>;

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, BackendError>;

    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, BackendError>;

    async fn create_vehicle(&self, vehicle: &Vehicle) -> Result<VehicleId, BackendError>;

    async fn update_vehicle(&self, id: VehicleId, vehicle: &Vehicle) -> Result<(), BackendError>;

    async fn delete_vehicle(&self, id: VehicleId) -> Result<(), BackendError>;
}
