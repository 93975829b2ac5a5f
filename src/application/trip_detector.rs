// Trip lifecycle detector - RPM driven start/stop state machine
use crate::domain::trip::TripSession;
use crate::infrastructure::config::TripSettings;

/// What a single sample did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// INACTIVE -> ACTIVE
    Started,
    /// Still ACTIVE, engine running
    Running,
    /// Still ACTIVE, but this sample counted towards stopping
    LowRpm { streak: u32 },
    /// ACTIVE -> INACTIVE
    Stopped,
    /// Still INACTIVE
    Idle,
}

#[derive(Debug, Clone)]
pub struct TripDetector {
    start_rpm: f64,
    stop_streak: u32,
}

impl TripDetector {
    pub fn new(start_rpm: f64, stop_streak: u32) -> Self {
        Self {
            start_rpm,
            stop_streak: stop_streak.max(1),
        }
    }

    pub fn from_settings(settings: &TripSettings) -> Self {
        Self::new(settings.start_rpm, settings.stop_streak)
    }

    /// Apply one RPM reading to the session.
    ///
    /// A missing reading (adapter offline, PID unsupported) counts the same
    /// as an idle one. The session's start time is taken from `now_ms`.
    pub fn observe(&self, session: &mut TripSession, rpm: Option<f64>, now_ms: i64) -> Transition {
        let engine_running = rpm.is_some_and(|r| r > self.start_rpm);

        match (session.active, engine_running) {
            (false, true) => {
                session.begin(now_ms);
                Transition::Started
            }
            (false, false) => Transition::Idle,
            (true, true) => {
                session.low_rpm_streak = 0;
                Transition::Running
            }
            (true, false) => {
                session.low_rpm_streak += 1;
                if session.low_rpm_streak >= self.stop_streak {
                    self.force_stop(session);
                    Transition::Stopped
                } else {
                    Transition::LowRpm {
                        streak: session.low_rpm_streak,
                    }
                }
            }
        }
    }

    /// Mark the session inactive without waiting for the streak.
    ///
    /// Only `active` and the streak are touched; the trip id and counters stay
    /// so the caller can close the server-side trip.
    pub fn force_stop(&self, session: &mut TripSession) -> bool {
        let was_active = session.active;
        session.active = false;
        session.low_rpm_streak = 0;
        was_active
    }
}
