// Telemetry poller - Fixed-rate live data reads with connectivity tracking
use crate::application::fleet_backend::FleetBackend;
use crate::application::trip_controller::{ControllerHandle, ControllerMessage};
use crate::domain::telemetry::{LiveReading, TelemetrySample};
use crate::infrastructure::config::PollerSettings;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Unknown,
    Connected,
    Lost,
}

/// Counts consecutive failed reads and reports connectivity changes once
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    max_failures: u32,
    consecutive_failures: u32,
    state: Connectivity,
}

impl ConnectionMonitor {
    pub fn new(max_failures: u32) -> Self {
        Self {
            max_failures: max_failures.max(1),
            consecutive_failures: 0,
            state: Connectivity::Unknown,
        }
    }

    /// Account for one read. Returns the new state only on the read that
    /// changed it.
    pub fn record(&mut self, online: bool) -> Option<Connectivity> {
        if online {
            self.consecutive_failures = 0;
            if self.state != Connectivity::Connected {
                self.state = Connectivity::Connected;
                return Some(Connectivity::Connected);
            }
            return None;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.max_failures && self.state != Connectivity::Lost {
            self.state = Connectivity::Lost;
            return Some(Connectivity::Lost);
        }
        None
    }

    pub fn state(&self) -> Connectivity {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// What the dashboard shows for the live widgets
#[derive(Debug, Clone, Serialize)]
pub struct LiveStatus {
    pub online: bool,
    pub sample: Option<TelemetrySample>,
    pub connectivity: Connectivity,
    pub consecutive_failures: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self {
            online: false,
            sample: None,
            connectivity: Connectivity::Unknown,
            consecutive_failures: 0,
            updated_at: None,
        }
    }
}

pub struct TelemetryPoller {
    backend: Arc<dyn FleetBackend>,
    settings: PollerSettings,
    monitor: ConnectionMonitor,
    controller: ControllerHandle,
    status: watch::Sender<LiveStatus>,
}

impl TelemetryPoller {
    pub fn new(
        backend: Arc<dyn FleetBackend>,
        settings: PollerSettings,
        controller: ControllerHandle,
    ) -> (Self, watch::Receiver<LiveStatus>) {
        let (status, status_rx) = watch::channel(LiveStatus::default());
        let monitor = ConnectionMonitor::new(settings.max_consecutive_failures);
        let poller = Self {
            backend,
            settings,
            monitor,
            controller,
            status,
        };
        (poller, status_rx)
    }

    /// Poll on a fixed-rate timer until the controller goes away. A tick that
    /// comes due while a read is still outstanding is skipped, never queued.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.settings.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Polling live data every {:?}", self.settings.interval());
        loop {
            interval.tick().await;
            if !self.poll_once().await {
                tracing::info!("Trip controller stopped, poller exiting");
                break;
            }
        }
    }

    /// One read. Returns false when the controller no longer accepts readings.
    pub async fn poll_once(&mut self) -> bool {
        let reading = match self.backend.fetch_live_data().await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("Live data read failed: {}", e);
                LiveReading::Offline
            }
        };

        match self.monitor.record(reading.is_online()) {
            Some(Connectivity::Connected) => tracing::info!("OBD connected"),
            Some(Connectivity::Lost) => tracing::warn!(
                failures = self.monitor.consecutive_failures(),
                "OBD connection lost"
            ),
            _ => {}
        }

        self.status.send_replace(LiveStatus {
            online: reading.is_online(),
            sample: reading.sample().cloned(),
            connectivity: self.monitor.state(),
            consecutive_failures: self.monitor.consecutive_failures(),
            updated_at: Some(Utc::now()),
        });

        self.controller
            .deliver(ControllerMessage::Reading(reading))
            .await
    }
}
