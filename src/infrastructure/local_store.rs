// JSON file backed key-value store for client-side state
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Keys shared by everything that reads or writes the store
pub mod keys {
    pub const ACTIVE_VEHICLE_ID: &str = "activeVehicleId";
    pub const ACTIVE_VEHICLE_INFO: &str = "activeVehicleInfo";
    pub const VEHICLE_FORM: &str = "vehicleInfo";

    pub fn maintenance_history(vehicle_id: crate::domain::vehicle::VehicleId) -> String {
        format!("maintenanceHistory_{}", vehicle_id)
    }
}

#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl LocalStore {
    /// Open the store at `path`. A missing file starts empty; so does a
    /// corrupt one, which is overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable local store {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened local store {} with {} keys", path.display(), entries.len());
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.lock();
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    /// Read and decode a value. Missing keys and values of the wrong shape
    /// both come back as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Local store key {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Read, modify and write back `key` under a single lock, so concurrent
    /// updates of the same key never overwrite each other. A missing or
    /// wrong-shaped value starts from `T::default()`. Nothing is written when
    /// `apply` fails.
    pub fn update<T, R, E>(&self, key: &str, apply: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default,
        E: From<StoreError>,
    {
        let mut entries = self.lock();
        let mut value: T = entries
            .get(key)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let output = apply(&mut value)?;
        let encoded = serde_json::to_value(&value).map_err(StoreError::from)?;
        entries.insert(key.to_string(), encoded);
        self.persist(&entries)?;
        Ok(output)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Write to a sibling temp file and rename so a crash never leaves half a file
    fn persist(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
