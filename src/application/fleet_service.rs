// Fleet service - Vehicle CRUD, active vehicle selection and maintenance log
use crate::application::fleet_backend::FleetBackend;
use crate::domain::vehicle::{MaintenanceRecord, Vehicle, VehicleId};
use crate::error::FleetError;
use crate::infrastructure::local_store::{keys, LocalStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct FleetService {
    backend: Arc<dyn FleetBackend>,
    store: Arc<LocalStore>,
}

impl FleetService {
    pub fn new(backend: Arc<dyn FleetBackend>, store: Arc<LocalStore>) -> Self {
        Self { backend, store }
    }

    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, FleetError> {
        Ok(self.backend.list_vehicles().await?)
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, FleetError> {
        Ok(self.backend.get_vehicle(id).await?)
    }

    pub async fn create_vehicle(&self, vehicle: &Vehicle) -> Result<VehicleId, FleetError> {
        let id = self.backend.create_vehicle(vehicle).await?;
        tracing::info!(vehicle_id = id, "Vehicle created");
        Ok(id)
    }

    /// Update on the backend and refresh the cached info if it is the active one
    pub async fn update_vehicle(&self, id: VehicleId, vehicle: &Vehicle) -> Result<(), FleetError> {
        self.backend.update_vehicle(id, vehicle).await?;
        if self.active_vehicle_id() == Some(id) {
            let refreshed = self.backend.get_vehicle(id).await?;
            self.with_store(move |store| Ok(store.set(keys::ACTIVE_VEHICLE_INFO, &refreshed)?))
                .await?;
        }
        Ok(())
    }

    /// Deleting the active vehicle also clears the selection
    pub async fn delete_vehicle(&self, id: VehicleId) -> Result<(), FleetError> {
        self.backend.delete_vehicle(id).await?;
        if self.active_vehicle_id() == Some(id) {
            self.clear_active().await?;
        }
        tracing::info!(vehicle_id = id, "Vehicle deleted");
        Ok(())
    }

    pub async fn select_active(&self, id: VehicleId) -> Result<Vehicle, FleetError> {
        let vehicle = self.backend.get_vehicle(id).await?;
        tracing::info!(vehicle_id = id, "Active vehicle: {}", vehicle.display_name());
        self.with_store(move |store| {
            store.set(keys::ACTIVE_VEHICLE_ID, &id)?;
            store.set(keys::ACTIVE_VEHICLE_INFO, &vehicle)?;
            Ok(vehicle)
        })
        .await
    }

    pub async fn clear_active(&self) -> Result<(), FleetError> {
        self.with_store(|store| {
            store.remove(keys::ACTIVE_VEHICLE_ID)?;
            store.remove(keys::ACTIVE_VEHICLE_INFO)?;
            Ok(())
        })
        .await
    }

    pub fn active_vehicle_id(&self) -> Option<VehicleId> {
        self.store.get(keys::ACTIVE_VEHICLE_ID)
    }

    pub fn active_vehicle_info(&self) -> Option<Vehicle> {
        self.store.get(keys::ACTIVE_VEHICLE_INFO)
    }

    /// Draft of the vehicle form, kept between sessions
    pub async fn save_vehicle_form(&self, draft: &Vehicle) -> Result<(), FleetError> {
        let draft = draft.clone();
        self.with_store(move |store| Ok(store.set(keys::VEHICLE_FORM, &draft)?))
            .await
    }

    pub fn vehicle_form(&self) -> Option<Vehicle> {
        self.store.get(keys::VEHICLE_FORM)
    }

    /// Oldest first. Empty when no vehicle is active.
    pub fn maintenance_history(&self) -> Vec<MaintenanceRecord> {
        self.active_vehicle_id()
            .and_then(|id| self.store.get(&keys::maintenance_history(id)))
            .unwrap_or_default()
    }

    pub async fn add_maintenance(&self, record: MaintenanceRecord) -> Result<Vec<MaintenanceRecord>, FleetError> {
        let key = self.maintenance_key()?;
        self.with_store(move |store| {
            store.update(&key, |history: &mut Vec<MaintenanceRecord>| {
                history.push(record);
                Ok::<_, FleetError>(history.clone())
            })
        })
        .await
    }

    pub async fn remove_maintenance(&self, index: usize) -> Result<Vec<MaintenanceRecord>, FleetError> {
        let key = self.maintenance_key()?;
        self.with_store(move |store| {
            store.update(&key, |history: &mut Vec<MaintenanceRecord>| {
                if index >= history.len() {
                    return Err(FleetError::MaintenanceIndex(index));
                }
                history.remove(index);
                Ok(history.clone())
            })
        })
        .await
    }

    fn maintenance_key(&self) -> Result<String, FleetError> {
        let id = self.active_vehicle_id().ok_or(FleetError::NoActiveVehicle)?;
        Ok(keys::maintenance_history(id))
    }

    // Store writes hit the disk, keep them off the async workers
    async fn with_store<R, F>(&self, write: F) -> Result<R, FleetError>
    where
        F: FnOnce(&LocalStore) -> Result<R, FleetError> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || write(&store)).await?
    }
}
