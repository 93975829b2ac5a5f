// Main entry point - Dependency injection and task setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::application::fleet_backend::FleetBackend;
use crate::application::fleet_service::FleetService;
use crate::application::poller::TelemetryPoller;
use crate::application::trip_controller::{ControllerHandle, TripController};
use crate::infrastructure::config::load_tracker_config;
use crate::infrastructure::http_backend::HttpFleetBackend;
use crate::infrastructure::local_store::LocalStore;
use crate::infrastructure::location_feed::LocationFeed;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("obd_trip_tracker=info,tower_http=info")),
        )
        .init();

    let config = load_tracker_config()?;
    tracing::info!(backend = %config.backend.base_url, "Configuration loaded");

    // Infrastructure
    let backend: Arc<dyn FleetBackend> = Arc::new(HttpFleetBackend::new(&config.backend)?);
    let store = Arc::new(LocalStore::open(&config.storage.path)?);
    let location_feed = LocationFeed::default();

    // Trip pipeline: poller -> controller
    let (tx, inbox) = mpsc::channel(64);
    let controller = TripController::new(backend.clone(), store.clone(), &config);
    let handle = ControllerHandle::new(tx);
    let (poller, live) = TelemetryPoller::new(backend.clone(), config.poller.clone(), handle.clone());

    let controller_task = tokio::spawn(controller.run(inbox, location_feed.clone()));
    let poller_task = tokio::spawn(poller.run());

    let state = Arc::new(AppState {
        fleet: FleetService::new(backend, store),
        controller: handle,
        location_feed,
        live,
        gps_settings: config.gps.clone(),
    });
    let router = presentation::router(state);

    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting obd-trip-tracker on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    // Stopping the poller drops its controller handle; the router's went with
    // the server. The controller then drains and closes any open trip.
    poller_task.abort();
    let _ = poller_task.await;
    controller_task.await?;

    Ok(())
}
