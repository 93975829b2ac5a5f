// Trip session domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TripId = i64;

/// The one live trip. Owned by the trip controller, never shared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSession {
    pub trip_id: Option<TripId>,
    pub started_at_ms: i64,
    pub active: bool,
    pub low_rpm_streak: u32,
    pub distance_km: f64,
    pub data_point_count: u32,
    #[serde(skip)]
    speed: RunningMean,
    pub max_speed: f64,
    #[serde(skip)]
    rpm: RunningMean,
    pub max_rpm: f64,
    #[serde(skip)]
    load: RunningMean,
    /// Distance derived from the backend's OBD odometer since trip start
    pub obd_distance_km: f64,
    #[serde(skip)]
    odometer_start: Option<f64>,
}

impl TripSession {
    pub fn inactive() -> Self {
        Self {
            trip_id: None,
            started_at_ms: 0,
            active: false,
            low_rpm_streak: 0,
            distance_km: 0.0,
            data_point_count: 0,
            speed: RunningMean::default(),
            max_speed: 0.0,
            rpm: RunningMean::default(),
            max_rpm: 0.0,
            load: RunningMean::default(),
            obd_distance_km: 0.0,
            odometer_start: None,
        }
    }

    /// Reset every counter and mark the session active from `now_ms`
    pub fn begin(&mut self, now_ms: i64) {
        *self = Self {
            started_at_ms: now_ms,
            active: true,
            ..Self::inactive()
        };
    }

    pub fn end(&mut self) {
        *self = Self::inactive();
    }

    pub fn record_speed(&mut self, speed_kmh: f64) {
        if !speed_kmh.is_finite() || speed_kmh < 0.0 {
            return;
        }
        self.speed.add(speed_kmh);
        self.max_speed = self.max_speed.max(speed_kmh);
    }

    /// Engine figures from a sample taken while the trip was running
    pub fn record_engine(&mut self, rpm: Option<f64>, engine_load: Option<f64>) {
        if let Some(rpm) = rpm.filter(|r| r.is_finite() && *r >= 0.0) {
            self.rpm.add(rpm);
            self.max_rpm = self.max_rpm.max(rpm);
        }
        if let Some(load) = engine_load.filter(|l| l.is_finite()) {
            self.load.add(load);
        }
    }

    /// Track the backend's cumulative distance reading as a delta from the
    /// first value seen during this trip. If the counter resets, counting
    /// continues from the distance already covered.
    pub fn record_odometer(&mut self, total_km: f64) {
        if !total_km.is_finite() {
            return;
        }
        match self.odometer_start {
            Some(start) if total_km >= start => self.obd_distance_km = total_km - start,
            _ => {
                self.odometer_start = Some(total_km - self.obd_distance_km);
            }
        }
    }

    pub fn average_speed(&self) -> f64 {
        self.speed.mean()
    }

    pub fn duration_secs(&self, now_ms: i64) -> i64 {
        ((now_ms - self.started_at_ms) / 1000).max(0)
    }

    pub fn stats(&self, distance_km: f64, now: DateTime<Utc>) -> TripStats {
        TripStats {
            distance_km,
            avg_speed: self.average_speed(),
            max_speed: self.max_speed,
            avg_rpm: self.rpm.mean(),
            max_rpm: self.max_rpm,
            avg_load: self.load.mean(),
            data_points: self.data_point_count,
            duration: self.duration_secs(now.timestamp_millis()),
            end_time: now,
        }
    }
}

impl Default for TripSession {
    fn default() -> Self {
        Self::inactive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct RunningMean {
    sum: f64,
    count: u32,
}

impl RunningMean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregates reported when a trip is closed. The backend stores the
/// distance under `distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStats {
    #[serde(rename = "distance", alias = "distance_km")]
    pub distance_km: f64,
    pub avg_speed: f64,
    pub max_speed: f64,
    #[serde(default)]
    pub avg_rpm: f64,
    #[serde(default)]
    pub max_rpm: f64,
    #[serde(default)]
    pub avg_load: f64,
    pub data_points: u32,
    /// Seconds
    pub duration: i64,
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stats_from_session() {
        let mut session = TripSession::inactive();
        session.begin(1_000_000);
        session.record_speed(40.0);
        session.record_speed(60.0);
        session.record_speed(f64::NAN);
        session.data_point_count = 2;

        let now = Utc.timestamp_millis_opt(1_090_500).unwrap();
        let stats = session.stats(1.25, now);

        assert_eq!(stats.avg_speed, 50.0);
        assert_eq!(stats.max_speed, 60.0);
        assert_eq!(stats.duration, 90);
        assert_eq!(stats.data_points, 2);
        assert_eq!(stats.distance_km, 1.25);
    }

    #[test]
    fn test_engine_aggregates() {
        let mut session = TripSession::inactive();
        session.begin(0);
        session.record_engine(Some(800.0), Some(20.0));
        session.record_engine(Some(2400.0), None);
        session.record_engine(None, Some(40.0));

        let stats = session.stats(0.0, Utc::now());
        assert_eq!(stats.avg_rpm, 1600.0);
        assert_eq!(stats.max_rpm, 2400.0);
        assert_eq!(stats.avg_load, 30.0);
    }

    #[test]
    fn test_stats_wire_keys() {
        let mut session = TripSession::inactive();
        session.begin(0);
        session.record_engine(Some(1200.0), Some(35.0));
        let stats = session.stats(3.2, Utc::now());

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["distance"], 3.2);
        assert!(json.get("distance_km").is_none());
        assert_eq!(json["avg_rpm"], 1200.0);
        assert_eq!(json["max_rpm"], 1200.0);
        assert_eq!(json["avg_load"], 35.0);

        let decoded: TripStats = serde_json::from_value(serde_json::json!({
            "distance_km": 1.5,
            "avg_speed": 30.0,
            "max_speed": 60.0,
            "data_points": 4,
            "duration": 120,
            "end_time": "2025-06-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(decoded.distance_km, 1.5);
        assert_eq!(decoded.avg_rpm, 0.0);
    }

    #[test]
    fn test_begin_resets_previous_trip() {
        let mut session = TripSession::inactive();
        session.begin(10);
        session.trip_id = Some(7);
        session.low_rpm_streak = 3;
        session.record_speed(80.0);
        session.record_engine(Some(3000.0), Some(70.0));

        session.begin(20);
        assert!(session.active);
        assert_eq!(session.trip_id, None);
        assert_eq!(session.low_rpm_streak, 0);
        assert_eq!(session.max_speed, 0.0);
        assert_eq!(session.max_rpm, 0.0);
        assert_eq!(session.started_at_ms, 20);

        session.end();
        assert_eq!(session, TripSession::inactive());
    }

    #[test]
    fn test_odometer_delta() {
        let mut session = TripSession::inactive();
        session.begin(0);
        session.record_odometer(120.0);
        session.record_odometer(120.4);
        session.record_odometer(121.5);
        assert!((session.obd_distance_km - 1.5).abs() < 1e-9);

        // backend counter restarted: keep what we had and continue from there
        session.record_odometer(0.2);
        assert!((session.obd_distance_km - 1.5).abs() < 1e-9);
        session.record_odometer(0.7);
        assert!((session.obd_distance_km - 2.0).abs() < 1e-9);
    }
}
