// GPS distance accumulator - Haversine sum with a jump filter
use crate::domain::geo::{GeoError, GeoPoint};
use crate::infrastructure::config::GpsSettings;

const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone)]
pub struct GpsAccumulator {
    noise_threshold_km: f64,
    max_speed_kmh: f64,
    running: bool,
    last_position: Option<GeoPoint>,
    total_distance_km: f64,
    points: Vec<GeoPoint>,
}

impl GpsAccumulator {
    pub fn new(noise_threshold_km: f64, max_speed_kmh: f64) -> Self {
        Self {
            noise_threshold_km,
            max_speed_kmh,
            running: false,
            last_position: None,
            total_distance_km: 0.0,
            points: Vec::new(),
        }
    }

    pub fn from_settings(settings: &GpsSettings) -> Self {
        Self::new(settings.noise_threshold_km, settings.max_speed_kmh)
    }

    /// Begin accepting fixes. Returns false if the watch was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            tracing::debug!("GPS watch already running");
            return false;
        }
        self.running = true;
        self.last_position = None;
        self.total_distance_km = 0.0;
        self.points.clear();
        tracing::info!("GPS watch started");
        true
    }

    /// Cancel the watch and drop all accumulated state. No-op when stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        tracing::info!(
            points = self.points.len(),
            "GPS watch stopped, total GPS distance {:.3} km",
            self.total_distance_km
        );
        self.running = false;
        self.last_position = None;
        self.total_distance_km = 0.0;
        self.points.clear();
    }

    /// Feed one fix. Returns the increment that was added to the total, if any.
    pub fn on_position(&mut self, position: GeoPoint) -> Option<f64> {
        if !self.running {
            return None;
        }

        let mut added = None;
        if let Some(previous) = &self.last_position {
            let increment = previous.distance_km(&position);
            if increment < self.noise_threshold_km {
                self.total_distance_km += increment;
                added = Some(increment);
            } else {
                tracing::debug!("Discarding GPS jump of {:.3} km", increment);
            }
        }

        self.last_position = Some(position);
        self.points.push(position);

        if self.points.len() % 10 == 0 {
            tracing::debug!(
                "{} GPS points, {:.3} km, accuracy {:.0} m",
                self.points.len(),
                self.total_distance_km,
                position.accuracy
            );
        }

        added
    }

    /// Location errors freeze the accumulator; the watch itself keeps going.
    pub fn on_error(&self, error: GeoError) {
        tracing::error!("GPS error: {}", error);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_position(&self) -> Option<&GeoPoint> {
        self.last_position.as_ref()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn current_total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    /// GPS ground speed in km/h when the last fix carries a plausible one,
    /// otherwise the OBD speed.
    pub fn preferred_speed(&self, obd_speed: Option<f64>) -> Option<f64> {
        let gps_kmh = self
            .last_position
            .and_then(|p| p.speed_mps)
            .filter(|mps| *mps > 0.0)
            .map(|mps| mps * MPS_TO_KMH)
            .filter(|kmh| *kmh < self.max_speed_kmh);

        gps_kmh.or(obd_speed)
    }

    /// GPS total when the watch is running and has covered some ground,
    /// otherwise the OBD-derived distance.
    pub fn preferred_distance(&self, obd_distance_km: f64) -> f64 {
        if self.running && self.total_distance_km > 0.0 {
            self.total_distance_km
        } else {
            obd_distance_km
        }
    }
}
