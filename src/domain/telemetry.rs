// Telemetry data domain models
use super::geo::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single live OBD reading, keyed by PID name the way the backend reports it.
///
/// Every PID is optional: the adapter may not support it, the backend may skip
/// it between thermal reads, or it may come back as something that is not a
/// number. All of those decode to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(rename = "RPM", default, deserialize_with = "lenient_f64")]
    pub rpm: Option<f64>,
    #[serde(rename = "SPEED", default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
    #[serde(rename = "ENGINE_LOAD", default, deserialize_with = "lenient_f64")]
    pub engine_load: Option<f64>,
    #[serde(rename = "COOLANT_TEMP", default, deserialize_with = "lenient_f64")]
    pub coolant_temp: Option<f64>,
    #[serde(rename = "INTAKE_TEMP", default, deserialize_with = "lenient_f64")]
    pub intake_temp: Option<f64>,
    #[serde(rename = "MAF", default, deserialize_with = "lenient_f64")]
    pub maf: Option<f64>,
    #[serde(rename = "THROTTLE_POS", default, deserialize_with = "lenient_f64")]
    pub throttle_pos: Option<f64>,
    #[serde(rename = "FUEL_PRESSURE", default, deserialize_with = "lenient_f64")]
    pub fuel_pressure: Option<f64>,
    /// Distance the backend has integrated from OBD speed, in km
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_distance: Option<f64>,
    #[serde(skip_deserializing, default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TelemetrySample {
    pub fn with_rpm(rpm: Option<f64>) -> Self {
        Self {
            rpm,
            ..Self::default()
        }
    }
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            rpm: None,
            speed: None,
            engine_load: None,
            coolant_temp: None,
            intake_temp: None,
            maf: None,
            throttle_pos: None,
            fuel_pressure: None,
            total_distance: None,
            timestamp: Utc::now(),
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

/// Outcome of one live-data read
#[derive(Debug, Clone, PartialEq)]
pub enum LiveReading {
    Online(TelemetrySample),
    Offline,
}

impl LiveReading {
    /// Interpret a raw live-data payload.
    ///
    /// `"offline": true` or `"connected": false` mark the adapter as gone.
    /// A payload that is not an object is treated the same way.
    pub fn from_payload(payload: serde_json::Value) -> Self {
        let flag = |key: &str| payload.get(key).and_then(|v| v.as_bool());

        if flag("offline") == Some(true) || flag("connected") == Some(false) {
            return LiveReading::Offline;
        }

        if !payload.is_object() {
            return LiveReading::Offline;
        }

        match serde_json::from_value::<TelemetrySample>(payload) {
            Ok(sample) => LiveReading::Online(sample),
            Err(e) => {
                tracing::debug!("Undecodable live payload treated as offline: {}", e);
                LiveReading::Offline
            }
        }
    }

    pub fn rpm(&self) -> Option<f64> {
        self.sample().and_then(|s| s.rpm)
    }

    pub fn sample(&self) -> Option<&TelemetrySample> {
        match self {
            LiveReading::Online(sample) => Some(sample),
            LiveReading::Offline => None,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, LiveReading::Online(_))
    }
}

/// Telemetry + GPS record uploaded to `/api/trips/{id}/data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDataPoint {
    pub timestamp: DateTime<Utc>,
    pub rpm: Option<f64>,
    pub speed: Option<f64>,
    pub coolant_temp: Option<f64>,
    pub intake_temp: Option<f64>,
    pub maf: Option<f64>,
    pub engine_load: Option<f64>,
    pub throttle_pos: Option<f64>,
    pub fuel_pressure: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TripDataPoint {
    /// Pair a sample with the most recently seen fix, which may lag the sample.
    pub fn new(sample: &TelemetrySample, position: Option<&GeoPoint>) -> Self {
        Self {
            timestamp: sample.timestamp,
            rpm: sample.rpm,
            speed: sample.speed,
            coolant_temp: sample.coolant_temp,
            intake_temp: sample.intake_temp,
            maf: sample.maf,
            engine_load: sample.engine_load,
            throttle_pos: sample.throttle_pos,
            fuel_pressure: sample.fuel_pressure,
            latitude: position.map(|p| p.latitude),
            longitude: position.map(|p| p.longitude),
        }
    }
}
