use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TrackerConfig {
    pub backend: BackendSettings,
    pub poller: PollerSettings,
    pub trip: TripSettings,
    pub gps: GpsSettings,
    pub server: ServerSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    /// `/get_live_data` on older backends, `/api/live_data` on newer ones
    pub live_data_path: String,
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            live_data_path: "/get_live_data".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerSettings {
    pub interval_ms: u64,
    pub max_consecutive_failures: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            max_consecutive_failures: 3,
        }
    }
}

impl PollerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TripSettings {
    pub start_rpm: f64,
    pub stop_streak: u32,
    pub batch_size: usize,
    /// Samples kept in memory for the active trip
    pub history_capacity: usize,
}

impl Default for TripSettings {
    fn default() -> Self {
        Self {
            start_rpm: 400.0,
            stop_streak: 5,
            batch_size: 10,
            history_capacity: 500,
        }
    }
}

/// Accumulator thresholds plus the watch options handed to location bridges
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GpsSettings {
    pub noise_threshold_km: f64,
    pub max_speed_kmh: f64,
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            noise_threshold_km: 0.1,
            max_speed_kmh: 250.0,
            high_accuracy: true,
            timeout_ms: 5000,
            maximum_age_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "data/local_store.json".to_string(),
        }
    }
}

/// Load `config/tracker.*` (optional) overlaid with `TRACKER_*` variables,
/// e.g. `TRACKER_BACKEND__BASE_URL` or `TRACKER_TRIP__BATCH_SIZE`.
pub fn load_tracker_config() -> anyhow::Result<TrackerConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/tracker").required(false))
        .add_source(
            config::Environment::with_prefix("TRACKER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Join the backend base URL and a path without doubling or dropping slashes
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
