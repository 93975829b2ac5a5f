// Location event source - fan-out of geolocation fixes to active watches
use crate::domain::geo::{GeoError, GeoPoint};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    Fix(GeoPoint),
    Error(GeoError),
}

/// Publishers (the `/gps` endpoint, a serial GPS reader, a replay) push events
/// here; a watch receives them only while subscribed. Dropping the
/// `LocationWatch` is the unsubscribe.
#[derive(Debug, Clone)]
pub struct LocationFeed {
    tx: broadcast::Sender<LocationEvent>,
}

pub struct LocationWatch {
    rx: broadcast::Receiver<LocationEvent>,
}

impl LocationFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver an event. Returns false when nobody is watching.
    pub fn publish(&self, event: LocationEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn subscribe(&self) -> LocationWatch {
        LocationWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

impl LocationWatch {
    /// Next event, skipping over any the watch was too slow to receive.
    /// `None` once every publisher is gone.
    pub async fn next(&mut self) -> Option<LocationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Location watch lagged, {} fixes dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
