// Error types shared across layers
use thiserror::Error;

/// Failures talking to the fleet backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

/// Failures reading or writing the local key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("local store value could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no active vehicle selected")]
    NoActiveVehicle,

    #[error("maintenance entry {0} does not exist")]
    MaintenanceIndex(usize),

    #[error("local store task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}
