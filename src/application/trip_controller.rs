// Trip controller - Single owner of trip, GPS and buffer state
use crate::application::fleet_backend::FleetBackend;
use crate::application::gps_accumulator::GpsAccumulator;
use crate::application::trip_buffer::TripDataBuffer;
use crate::application::trip_detector::{Transition, TripDetector};
use crate::domain::geo::GeoPoint;
use crate::domain::telemetry::{LiveReading, TelemetrySample, TripDataPoint};
use crate::domain::trip::{TripId, TripSession, TripStats};
use crate::domain::vehicle::VehicleId;
use crate::infrastructure::config::TrackerConfig;
use crate::infrastructure::local_store::{keys, LocalStore};
use crate::infrastructure::location_feed::{LocationEvent, LocationFeed, LocationWatch};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Everything the controller reacts to arrives as one of these
#[derive(Debug)]
pub enum ControllerMessage {
    Reading(LiveReading),
    Location(LocationEvent),
    EndTrip(oneshot::Sender<Option<TripStats>>),
    Snapshot(oneshot::Sender<TripSnapshot>),
    History(oneshot::Sender<Vec<TelemetrySample>>),
}

/// Read-only view of the controller for the status API
#[derive(Debug, Clone, Default, Serialize)]
pub struct TripSnapshot {
    pub active: bool,
    pub trip_id: Option<TripId>,
    pub started_at_ms: Option<i64>,
    pub low_rpm_streak: u32,
    pub distance_km: f64,
    pub data_point_count: u32,
    pub buffered_points: usize,
    pub avg_speed: f64,
    pub max_speed: f64,
    pub gps_running: bool,
    pub gps_distance_km: f64,
    pub gps_points: usize,
    pub last_position: Option<GeoPoint>,
    pub history_len: usize,
}

pub struct TripController {
    backend: Arc<dyn FleetBackend>,
    store: Arc<LocalStore>,
    detector: TripDetector,
    gps: GpsAccumulator,
    buffer: TripDataBuffer,
    session: TripSession,
    history: VecDeque<TelemetrySample>,
    history_capacity: usize,
    feed: Option<LocationFeed>,
    location: Option<LocationWatch>,
}

impl TripController {
    pub fn new(backend: Arc<dyn FleetBackend>, store: Arc<LocalStore>, config: &TrackerConfig) -> Self {
        Self {
            backend,
            store,
            detector: TripDetector::from_settings(&config.trip),
            gps: GpsAccumulator::from_settings(&config.gps),
            buffer: TripDataBuffer::new(config.trip.batch_size),
            session: TripSession::inactive(),
            history: VecDeque::with_capacity(config.trip.history_capacity),
            history_capacity: config.trip.history_capacity,
            feed: None,
            location: None,
        }
    }

    /// Process messages until every sender is dropped. Location events are
    /// received only while a trip holds the GPS watch open.
    pub async fn run(mut self, mut inbox: mpsc::Receiver<ControllerMessage>, feed: LocationFeed) {
        self.feed = Some(feed);

        loop {
            let message = tokio::select! {
                message = inbox.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
                Some(event) = next_location(&mut self.location) => ControllerMessage::Location(event),
            };
            self.handle(message).await;
        }

        if self.session.active {
            info!("Controller shutting down with a trip in progress, closing it");
            self.end_trip(Utc::now()).await;
        }
    }

    pub async fn handle(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Reading(reading) => self.on_reading(reading, Utc::now()).await,
            ControllerMessage::Location(LocationEvent::Fix(point)) => self.on_position(point),
            ControllerMessage::Location(LocationEvent::Error(e)) => self.gps.on_error(e),
            ControllerMessage::EndTrip(reply) => {
                let stats = self.end_trip(Utc::now()).await;
                let _ = reply.send(stats);
            }
            ControllerMessage::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            ControllerMessage::History(reply) => {
                let _ = reply.send(self.history());
            }
        }
    }

    pub async fn on_reading(&mut self, reading: LiveReading, now: DateTime<Utc>) {
        let transition = self
            .detector
            .observe(&mut self.session, reading.rpm(), now.timestamp_millis());

        match transition {
            Transition::Started => {
                info!(rpm = ?reading.rpm(), "Trip detected");
                self.history.clear();
                if self.gps.start() {
                    // open before awaiting the backend so early fixes are kept
                    self.location = self.feed.as_ref().map(LocationFeed::subscribe);
                }
                self.open_trip(now, true).await;
                self.record(&reading).await;
            }
            Transition::Running => {
                if self.session.trip_id.is_none() {
                    self.open_trip(now, false).await;
                }
                self.record(&reading).await;
            }
            Transition::LowRpm { streak } => {
                debug!(streak, "Low RPM reading during trip");
                self.remember(&reading);
            }
            Transition::Stopped => {
                info!("Engine off, ending trip");
                self.close_trip(now).await;
            }
            Transition::Idle => {}
        }
    }

    pub fn on_position(&mut self, point: GeoPoint) {
        if self.gps.on_position(point).is_some() && self.session.active {
            self.refresh_distance();
        }
    }

    /// Manually end the active trip. Returns `None` when no trip was active.
    pub async fn end_trip(&mut self, now: DateTime<Utc>) -> Option<TripStats> {
        if !self.detector.force_stop(&mut self.session) {
            debug!("End trip requested with no active trip");
            return None;
        }
        info!("Trip ended by request");
        Some(self.close_trip(now).await)
    }

    pub fn snapshot(&self) -> TripSnapshot {
        TripSnapshot {
            active: self.session.active,
            trip_id: self.session.trip_id,
            started_at_ms: self.session.active.then_some(self.session.started_at_ms),
            low_rpm_streak: self.session.low_rpm_streak,
            distance_km: self.session.distance_km,
            data_point_count: self.session.data_point_count,
            buffered_points: self.buffer.len(),
            avg_speed: self.session.average_speed(),
            max_speed: self.session.max_speed,
            gps_running: self.gps.is_running(),
            gps_distance_km: self.gps.current_total_distance_km(),
            gps_points: self.gps.points().len(),
            last_position: self.gps.last_position().copied(),
            history_len: self.history.len(),
        }
    }

    /// Recent samples of the current trip, oldest first
    pub fn history(&self) -> Vec<TelemetrySample> {
        self.history.iter().cloned().collect()
    }

    fn active_vehicle_id(&self) -> Option<VehicleId> {
        self.store.get::<VehicleId>(keys::ACTIVE_VEHICLE_ID)
    }

    /// Ask the backend for a trip id. Failures are retried by the next
    /// qualifying sample; nothing is buffered until an id exists.
    async fn open_trip(&mut self, now: DateTime<Utc>, first_attempt: bool) {
        let Some(vehicle_id) = self.active_vehicle_id() else {
            if first_attempt {
                warn!("No active vehicle selected, trip data will not be uploaded");
            }
            return;
        };

        let started_at = self.session.started_at_ms;
        match self.backend.start_trip(vehicle_id, now).await {
            Ok(trip_id) => {
                if !self.session.active
                    || self.session.started_at_ms != started_at
                    || self.session.trip_id.is_some()
                {
                    warn!(trip_id, "Trip id arrived for a trip that is no longer current, ignoring");
                    return;
                }
                self.session.trip_id = Some(trip_id);
                self.buffer.clear();
                info!(trip_id, vehicle_id, "Trip opened on backend");
            }
            Err(e) => {
                error!("Failed to open trip on backend, will retry: {}", e);
            }
        }
    }

    async fn record(&mut self, reading: &LiveReading) {
        let Some(sample) = reading.sample() else {
            return;
        };
        self.remember(reading);

        if let Some(total) = sample.total_distance {
            self.session.record_odometer(total);
        }
        if let Some(speed) = self.gps.preferred_speed(sample.speed) {
            self.session.record_speed(speed);
        }
        self.session.record_engine(sample.rpm, sample.engine_load);
        self.refresh_distance();

        if self.session.trip_id.is_none() {
            debug!("No trip id yet, dropping sample");
            return;
        }

        let point = TripDataPoint::new(sample, self.gps.last_position());
        self.session.data_point_count += 1;
        if self.buffer.push(point) {
            self.flush().await;
        }
    }

    fn remember(&mut self, reading: &LiveReading) {
        let Some(sample) = reading.sample() else {
            return;
        };
        if self.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample.clone());
    }

    fn refresh_distance(&mut self) {
        self.session.distance_km = self.gps.preferred_distance(self.session.obd_distance_km);
    }

    async fn flush(&mut self) {
        let Some(trip_id) = self.session.trip_id else {
            return;
        };
        let Some(batch) = self.buffer.begin_flush() else {
            return;
        };

        let result = self.backend.push_trip_data(trip_id, &batch).await;

        if self.session.trip_id != Some(trip_id) {
            warn!(trip_id, "Flush finished after its trip was closed, discarding result");
            self.buffer.abort_flush();
            return;
        }

        match result {
            Ok(saved) => {
                self.buffer.complete_flush(batch.len());
                info!(trip_id, saved, "Trip data uploaded");
            }
            Err(e) => {
                self.buffer.abort_flush();
                error!(trip_id, pending = self.buffer.len(), "Trip data upload failed: {}", e);
            }
        }
    }

    /// Final flush, close the server-side trip, reset everything.
    /// The session must already be marked inactive.
    async fn close_trip(&mut self, now: DateTime<Utc>) -> TripStats {
        self.flush().await;

        self.refresh_distance();
        let stats = self.session.stats(self.session.distance_km, now);

        match self.session.trip_id {
            Some(trip_id) => match self.backend.stop_trip(trip_id, &stats).await {
                Ok(()) => info!(
                    trip_id,
                    distance_km = stats.distance_km,
                    points = stats.data_points,
                    duration_s = stats.duration,
                    "Trip closed on backend"
                ),
                Err(e) => error!(trip_id, "Failed to close trip on backend: {}", e),
            },
            None => debug!("Trip ended before the backend assigned an id"),
        }

        if !self.buffer.is_empty() {
            warn!(dropped = self.buffer.len(), "Discarding trip data that could not be uploaded");
        }

        self.gps.stop();
        self.location = None;
        self.buffer.clear();
        self.history.clear();
        self.session.end();
        stats
    }
}

async fn next_location(watch: &mut Option<LocationWatch>) -> Option<LocationEvent> {
    match watch {
        Some(watch) => watch.next().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle used by the poller and the HTTP layer
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControllerMessage>,
}

impl ControllerHandle {
    pub fn new(tx: mpsc::Sender<ControllerMessage>) -> Self {
        Self { tx }
    }

    /// Returns false once the controller has stopped
    pub async fn deliver(&self, message: ControllerMessage) -> bool {
        self.tx.send(message).await.is_ok()
    }

    pub async fn snapshot(&self) -> Option<TripSnapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.deliver(ControllerMessage::Snapshot(reply)).await {
            return None;
        }
        rx.await.ok()
    }

    pub async fn end_trip(&self) -> Option<TripStats> {
        let (reply, rx) = oneshot::channel();
        if !self.deliver(ControllerMessage::EndTrip(reply)).await {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub async fn history(&self) -> Option<Vec<TelemetrySample>> {
        let (reply, rx) = oneshot::channel();
        if !self.deliver(ControllerMessage::History(reply)).await {
            return None;
        }
        rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::Vehicle;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Holds `start_trip` open until released
    #[derive(Default)]
    struct StartGate {
        entered: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        batches: Mutex<Vec<Vec<TripDataPoint>>>,
        stops: Mutex<Vec<(TripId, TripStats)>>,
        fail_start: Mutex<u32>,
        fail_data: Mutex<bool>,
        start_gate: Option<Arc<StartGate>>,
    }

    impl FakeBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn unavailable() -> BackendError {
            BackendError::Status {
                status: 503,
                body: "unavailable".into(),
            }
        }
    }

    #[async_trait]
    impl FleetBackend for FakeBackend {
        async fn fetch_live_data(&self) -> Result<LiveReading, BackendError> {
            Ok(LiveReading::Offline)
        }

        async fn start_trip(&self, vehicle_id: VehicleId, _: DateTime<Utc>) -> Result<TripId, BackendError> {
            self.calls.lock().unwrap().push(format!("start:{}", vehicle_id));
            if let Some(gate) = &self.start_gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            let mut fail = self.fail_start.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(Self::unavailable());
            }
            Ok(100)
        }

        async fn push_trip_data(&self, trip_id: TripId, points: &[TripDataPoint]) -> Result<usize, BackendError> {
            self.calls.lock().unwrap().push(format!("data:{}:{}", trip_id, points.len()));
            if *self.fail_data.lock().unwrap() {
                return Err(Self::unavailable());
            }
            self.batches.lock().unwrap().push(points.to_vec());
            Ok(points.len())
        }

        async fn stop_trip(&self, trip_id: TripId, stats: &TripStats) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(format!("stop:{}", trip_id));
            self.stops.lock().unwrap().push((trip_id, stats.clone()));
            Ok(())
        }

        async fn list_vehicles(&self) -> Result<Vec<Vehicle>, BackendError> {
            Ok(vec![])
        }

        async fn get_vehicle(&self, _: VehicleId) -> Result<Vehicle, BackendError> {
            Err(Self::unavailable())
        }

        async fn create_vehicle(&self, _: &Vehicle) -> Result<VehicleId, BackendError> {
            Err(Self::unavailable())
        }

        async fn update_vehicle(&self, _: VehicleId, _: &Vehicle) -> Result<(), BackendError> {
            Ok(())
        }

        async fn delete_vehicle(&self, _: VehicleId) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn controller(batch_size: usize) -> (TripController, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        let store = Arc::new(LocalStore::in_memory());
        store.set(keys::ACTIVE_VEHICLE_ID, &7i64).unwrap();

        let mut config = TrackerConfig::default();
        config.trip.batch_size = batch_size;
        let controller = TripController::new(backend.clone(), store, &config);
        (controller, backend)
    }

    fn online(rpm: f64) -> LiveReading {
        let mut sample = TelemetrySample::with_rpm(Some(rpm));
        sample.speed = Some(50.0);
        LiveReading::Online(sample)
    }

    async fn feed(controller: &mut TripController, rpms: &[f64]) {
        for rpm in rpms {
            controller.on_reading(online(*rpm), Utc::now()).await;
        }
    }

    #[tokio::test]
    async fn test_full_trip_lifecycle() {
        let (mut controller, backend) = controller(10);

        feed(&mut controller, &[0.0, 450.0, 460.0, 440.0, 0.0, 0.0, 0.0, 0.0]).await;
        assert!(controller.snapshot().active);
        assert_eq!(controller.snapshot().trip_id, Some(100));
        assert!(controller.snapshot().gps_running);

        feed(&mut controller, &[0.0]).await;
        let snapshot = controller.snapshot();
        assert!(!snapshot.active);
        assert_eq!(snapshot.trip_id, None);
        assert!(!snapshot.gps_running);
        assert_eq!(snapshot.buffered_points, 0);

        assert_eq!(backend.calls(), vec!["start:7", "data:100:3", "stop:100"]);
        let stops = backend.stops.lock().unwrap();
        assert_eq!(stops[0].1.data_points, 3);
        assert_eq!(stops[0].1.avg_speed, 50.0);
        assert_eq!(stops[0].1.avg_rpm, 450.0);
        assert_eq!(stops[0].1.max_rpm, 460.0);
    }

    #[tokio::test]
    async fn test_batch_size_triggers_exactly_one_flush() {
        let (mut controller, backend) = controller(10);
        let rpms = vec![1000.0; 10];
        feed(&mut controller, &rpms).await;

        assert_eq!(backend.calls(), vec!["start:7", "data:100:10"]);
        assert_eq!(backend.batches.lock().unwrap()[0].len(), 10);
        assert_eq!(controller.snapshot().buffered_points, 0);
    }

    #[tokio::test]
    async fn test_failed_flush_retains_and_retries() {
        let (mut controller, backend) = controller(3);
        *backend.fail_data.lock().unwrap() = true;

        feed(&mut controller, &[1000.0, 1000.0, 1000.0]).await;
        assert_eq!(controller.snapshot().buffered_points, 3);

        *backend.fail_data.lock().unwrap() = false;
        feed(&mut controller, &[1000.0]).await;
        assert_eq!(controller.snapshot().buffered_points, 0);

        let batches = backend.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);
    }

    #[tokio::test]
    async fn test_trip_creation_retried_and_early_samples_dropped() {
        let (mut controller, backend) = controller(10);
        *backend.fail_start.lock().unwrap() = 1;

        feed(&mut controller, &[1000.0]).await;
        assert!(controller.snapshot().active);
        assert_eq!(controller.snapshot().trip_id, None);
        assert_eq!(controller.snapshot().data_point_count, 0);

        feed(&mut controller, &[1000.0]).await;
        assert_eq!(controller.snapshot().trip_id, Some(100));
        assert_eq!(controller.snapshot().data_point_count, 1);
        assert_eq!(backend.calls(), vec!["start:7", "start:7"]);
    }

    #[tokio::test]
    async fn test_low_rpm_does_not_retry_creation() {
        let (mut controller, backend) = controller(10);
        *backend.fail_start.lock().unwrap() = 5;

        feed(&mut controller, &[1000.0, 0.0, 0.0]).await;
        assert_eq!(backend.calls(), vec!["start:7"]);
    }

    #[tokio::test]
    async fn test_no_active_vehicle_skips_backend() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = TripController::new(
            backend.clone(),
            Arc::new(LocalStore::in_memory()),
            &TrackerConfig::default(),
        );

        let mut rpms = vec![1000.0; 3];
        rpms.extend([0.0; 5]);
        feed(&mut controller, &rpms).await;

        assert!(backend.calls().is_empty());
        assert!(!controller.snapshot().active);
    }

    #[tokio::test]
    async fn test_offline_readings_end_trip() {
        let (mut controller, backend) = controller(10);
        feed(&mut controller, &[1000.0]).await;
        for _ in 0..5 {
            controller.on_reading(LiveReading::Offline, Utc::now()).await;
        }
        assert!(!controller.snapshot().active);
        assert_eq!(backend.calls(), vec!["start:7", "data:100:1", "stop:100"]);
    }

    #[tokio::test]
    async fn test_manual_end() {
        let (mut controller, backend) = controller(10);
        assert!(controller.end_trip(Utc::now()).await.is_none());

        feed(&mut controller, &[1000.0, 1100.0]).await;
        let stats = controller.end_trip(Utc::now()).await.expect("trip was active");
        assert_eq!(stats.data_points, 2);
        assert!(!controller.snapshot().active);
        assert_eq!(backend.calls(), vec!["start:7", "data:100:2", "stop:100"]);

        assert!(controller.end_trip(Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn test_gps_distance_reported_at_close() {
        let (mut controller, backend) = controller(10);
        feed(&mut controller, &[1000.0]).await;

        controller.on_position(GeoPoint::new(52.5200, 13.4050));
        controller.on_position(GeoPoint::new(52.5201, 13.4051));
        let snapshot = controller.snapshot();
        assert!((snapshot.distance_km - 0.013).abs() < 0.001);
        assert_eq!(snapshot.gps_points, 2);

        feed(&mut controller, &[1000.0]).await;
        controller.end_trip(Utc::now()).await;

        let stops = backend.stops.lock().unwrap();
        assert!((stops[0].1.distance_km - 0.013).abs() < 0.001);
        let batches = backend.batches.lock().unwrap();
        assert_eq!(batches[0][1].latitude, Some(52.5201));
        assert_eq!(batches[0][0].latitude, None);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let backend = Arc::new(FakeBackend::default());
        let mut config = TrackerConfig::default();
        config.trip.history_capacity = 4;
        config.trip.batch_size = 100;
        let mut controller = TripController::new(backend, Arc::new(LocalStore::in_memory()), &config);

        feed(&mut controller, &[1000.0; 9]).await;
        assert_eq!(controller.snapshot().history_len, 4);
    }

    #[tokio::test]
    async fn test_run_loop_subscribes_while_gps_running() {
        let (controller, _backend) = controller(10);
        let feed_source = LocationFeed::default();
        let (tx, rx) = mpsc::channel(16);
        let handle = ControllerHandle::new(tx);
        let task = tokio::spawn(controller.run(rx, feed_source.clone()));

        assert!(!handle.snapshot().await.unwrap().gps_running);
        assert_eq!(feed_source.watcher_count(), 0);

        handle.deliver(ControllerMessage::Reading(online(1500.0))).await;
        // the snapshot round-trip guarantees the loop has resubscribed
        assert!(handle.snapshot().await.unwrap().gps_running);
        assert_eq!(feed_source.watcher_count(), 1);

        feed_source.publish(LocationEvent::Fix(GeoPoint::new(52.5200, 13.4050)));
        feed_source.publish(LocationEvent::Fix(GeoPoint::new(52.5201, 13.4051)));
        let mut snapshot = handle.snapshot().await.unwrap();
        for _ in 0..50 {
            if snapshot.gps_points == 2 {
                break;
            }
            tokio::task::yield_now().await;
            snapshot = handle.snapshot().await.unwrap();
        }
        assert_eq!(snapshot.gps_points, 2);

        let stats = handle.end_trip().await.unwrap();
        assert!((stats.distance_km - 0.013).abs() < 0.001);
        handle.snapshot().await.unwrap();
        assert_eq!(feed_source.watcher_count(), 0);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_fixes_during_trip_creation_are_kept() {
        let gate = Arc::new(StartGate::default());
        let backend = Arc::new(FakeBackend {
            start_gate: Some(gate.clone()),
            ..FakeBackend::default()
        });
        let store = Arc::new(LocalStore::in_memory());
        store.set(keys::ACTIVE_VEHICLE_ID, &7i64).unwrap();
        let controller = TripController::new(backend.clone(), store, &TrackerConfig::default());

        let feed_source = LocationFeed::default();
        let (tx, rx) = mpsc::channel(16);
        let handle = ControllerHandle::new(tx);
        let task = tokio::spawn(controller.run(rx, feed_source.clone()));

        handle.deliver(ControllerMessage::Reading(online(1500.0))).await;
        gate.entered.notified().await;

        // the controller is still waiting for its trip id
        assert!(feed_source.publish(LocationEvent::Fix(GeoPoint::new(52.5200, 13.4050))));
        gate.release.notify_one();

        let mut snapshot = handle.snapshot().await.unwrap();
        for _ in 0..50 {
            if snapshot.gps_points == 1 {
                break;
            }
            tokio::task::yield_now().await;
            snapshot = handle.snapshot().await.unwrap();
        }
        assert_eq!(snapshot.trip_id, Some(100));
        assert_eq!(snapshot.gps_points, 1);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_active_trip() {
        let (controller, backend) = controller(10);
        let (tx, rx) = mpsc::channel(16);
        let handle = ControllerHandle::new(tx);
        let task = tokio::spawn(controller.run(rx, LocationFeed::default()));

        handle.deliver(ControllerMessage::Reading(online(1500.0))).await;
        handle.deliver(ControllerMessage::Reading(online(1600.0))).await;
        drop(handle);
        task.await.unwrap();

        assert_eq!(backend.calls(), vec!["start:7", "data:100:2", "stop:100"]);
        let stops = backend.stops.lock().unwrap();
        assert_eq!(stops[0].1.data_points, 2);
        assert_eq!(stops[0].1.max_rpm, 1600.0);
    }

    #[tokio::test]
    async fn test_history_served_through_handle() {
        let (controller, _backend) = controller(10);
        let (tx, rx) = mpsc::channel(16);
        let handle = ControllerHandle::new(tx);
        let task = tokio::spawn(controller.run(rx, LocationFeed::default()));

        handle.deliver(ControllerMessage::Reading(online(1500.0))).await;
        handle.deliver(ControllerMessage::Reading(online(0.0))).await;
        let history = handle.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].rpm, Some(1500.0));
        assert_eq!(history[1].rpm, Some(0.0));

        handle.end_trip().await.unwrap();
        assert!(handle.history().await.unwrap().is_empty());

        drop(handle);
        task.await.unwrap();
    }
}
