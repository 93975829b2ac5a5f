// HTTP implementation of the fleet backend
use crate::application::fleet_backend::FleetBackend;
use crate::domain::telemetry::{LiveReading, TripDataPoint};
use crate::domain::trip::{TripId, TripStats};
use crate::domain::vehicle::{Vehicle, VehicleId};
use crate::error::BackendError;
use crate::infrastructure::config::{endpoint_url, BackendSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct HttpFleetBackend {
    client: reqwest::Client,
    base_url: String,
    live_data_path: String,
}

#[derive(Debug, Serialize)]
struct StartTripRequest {
    vehicle_id: VehicleId,
    start_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct StartTripResponse {
    trip_id: TripId,
}

#[derive(Debug, Serialize)]
struct TripDataRequest<'a> {
    data_points: &'a [TripDataPoint],
}

#[derive(Debug, Deserialize)]
struct TripDataResponse {
    #[serde(default)]
    points_saved: Option<usize>,
}

#[derive(Debug, Serialize)]
struct StopTripRequest<'a> {
    stats: &'a TripStats,
}

#[derive(Debug, Deserialize)]
struct VehiclesResponse {
    #[serde(default)]
    vehicles: Vec<Vehicle>,
}

#[derive(Debug, Deserialize)]
struct VehicleResponse {
    vehicle: Vehicle,
}

#[derive(Debug, Deserialize)]
struct CreatedVehicleResponse {
    vehicle_id: VehicleId,
}

impl HttpFleetBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            live_data_path: settings.live_data_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FleetBackend for HttpFleetBackend {
    async fn fetch_live_data(&self) -> Result<LiveReading, BackendError> {
        let url = self.url(&self.live_data_path);
        let payload: serde_json::Value = self.send_json(self.client.get(&url)).await?;
        Ok(LiveReading::from_payload(payload))
    }

    async fn start_trip(
        &self,
        vehicle_id: VehicleId,
        start_time: DateTime<Utc>,
    ) -> Result<TripId, BackendError> {
        let body = StartTripRequest {
            vehicle_id,
            start_time,
        };
        let response: StartTripResponse = self
            .send_json(self.client.post(self.url("/api/trips/start")).json(&body))
            .await?;
        Ok(response.trip_id)
    }

    async fn push_trip_data(
        &self,
        trip_id: TripId,
        points: &[TripDataPoint],
    ) -> Result<usize, BackendError> {
        let url = self.url(&format!("/api/trips/{}/data", trip_id));
        let body = TripDataRequest {
            data_points: points,
        };
        let response: TripDataResponse = self.send_json(self.client.post(&url).json(&body)).await?;
        Ok(response.points_saved.unwrap_or(points.len()))
    }

    async fn stop_trip(&self, trip_id: TripId, stats: &TripStats) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/trips/{}/stop", trip_id));
        self.send(self.client.post(&url).json(&StopTripRequest { stats }))
            .await?;
        Ok(())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, BackendError> {
        let response: VehiclesResponse = self
            .send_json(self.client.get(self.url("/api/vehicles")))
            .await?;
        Ok(response.vehicles)
    }

    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, BackendError> {
        let url = self.url(&format!("/api/vehicles/{}", id));
        let response: VehicleResponse = self.send_json(self.client.get(&url)).await?;
        Ok(response.vehicle)
    }

    async fn create_vehicle(&self, vehicle: &Vehicle) -> Result<VehicleId, BackendError> {
        let response: CreatedVehicleResponse = self
            .send_json(self.client.post(self.url("/api/vehicles")).json(vehicle))
            .await?;
        Ok(response.vehicle_id)
    }

    async fn update_vehicle(&self, id: VehicleId, vehicle: &Vehicle) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/vehicles/{}", id));
        self.send(self.client.put(&url).json(vehicle)).await?;
        Ok(())
    }

    async fn delete_vehicle(&self, id: VehicleId) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/vehicles/{}", id));
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}
