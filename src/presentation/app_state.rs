// Application state for HTTP handlers
use crate::application::fleet_service::FleetService;
use crate::application::poller::LiveStatus;
use crate::application::trip_controller::ControllerHandle;
use crate::infrastructure::config::GpsSettings;
use crate::infrastructure::location_feed::LocationFeed;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub fleet: FleetService,
    pub controller: ControllerHandle,
    pub location_feed: LocationFeed,
    pub live: watch::Receiver<LiveStatus>,
    pub gps_settings: GpsSettings,
}
