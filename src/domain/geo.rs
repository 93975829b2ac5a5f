// Geolocation domain models
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A position fix delivered by the device location watch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    #[serde(default)]
    pub accuracy: f64,
    /// Ground speed in m/s, if the device reported one
    #[serde(default, rename = "speed")]
    pub speed_mps: Option<f64>,
    #[serde(default, rename = "timestamp")]
    pub timestamp_ms: i64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: 0.0,
            speed_mps: None,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Great-circle distance between two lat/lon pairs, in kilometers
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Reasons the location watch can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("unknown location error")]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_short_hop() {
        let d = haversine_km(52.5200, 13.4050, 52.5201, 13.4051);
        assert!((d - 0.013).abs() < 0.001, "got {}", d);
    }

    #[test]
    fn test_haversine_identity_and_symmetry() {
        assert_eq!(haversine_km(10.0, 20.0, 10.0, 20.0), 0.0);

        let ab = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        let ba = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((ab - ba).abs() < 1e-9);
        // Paris to London is roughly 344 km
        assert!((ab - 343.5).abs() < 2.0, "got {}", ab);
    }

    #[test]
    fn test_decode_browser_style_fix() {
        let fix: GeoPoint = serde_json::from_str(
            r#"{"latitude": 52.52, "longitude": 13.405, "accuracy": 8.0, "speed": null, "timestamp": 1700000000000}"#,
        )
        .unwrap();
        assert_eq!(fix.speed_mps, None);
        assert_eq!(fix.timestamp_ms, 1_700_000_000_000);

        let err: GeoError = serde_json::from_str(r#""permission_denied""#).unwrap();
        assert_eq!(err, GeoError::PermissionDenied);
    }
}
