// Vehicle and maintenance domain models
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type VehicleId = i64;

/// A fleet vehicle as the backend describes it.
///
/// Fields this client does not know about are carried in `extra` so a
/// fetched vehicle can be cached and sent back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<VehicleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vehicle {
    /// "Brand Model", falling back to the VIN or id
    pub fn display_name(&self) -> String {
        match (&self.brand, &self.model) {
            (Some(b), Some(m)) => format!("{} {}", b, m),
            (Some(b), None) => b.clone(),
            (None, Some(m)) => m.clone(),
            (None, None) => self
                .vin
                .clone()
                .or_else(|| self.id.map(|id| format!("Vehicle {}", id)))
                .unwrap_or_else(|| "Unknown vehicle".to_string()),
        }
    }
}

/// One entry of a vehicle's local maintenance log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MaintenanceRecord {
    pub fn new(kind: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            date: date.into(),
            mileage: None,
            notes: None,
            extra: Map::new(),
        }
    }
}
