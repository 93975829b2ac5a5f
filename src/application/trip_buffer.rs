// Trip data buffer - Batches records until the backend confirms them
use crate::domain::telemetry::TripDataPoint;

/// Ordered records waiting to be uploaded.
///
/// A flush is a two-step affair: `begin_flush` hands out a copy of the
/// pending records and marks a flush in flight; `complete_flush` drops exactly
/// the records that were sent, `abort_flush` keeps them for the next attempt.
/// Records pushed while a flush is in flight are never lost.
#[derive(Debug, Clone)]
pub struct TripDataBuffer {
    batch_size: usize,
    pending: Vec<TripDataPoint>,
    in_flight: bool,
}

impl TripDataBuffer {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
            in_flight: false,
        }
    }

    /// Append a record. Returns true when a flush is due.
    pub fn push(&mut self, point: TripDataPoint) -> bool {
        self.pending.push(point);
        self.pending.len() >= self.batch_size
    }

    /// Snapshot of the records to send, or `None` if there is nothing to send
    /// or another flush has not finished yet.
    pub fn begin_flush(&mut self) -> Option<Vec<TripDataPoint>> {
        if self.in_flight || self.pending.is_empty() {
            return None;
        }
        self.in_flight = true;
        Some(self.pending.clone())
    }

    /// The backend stored the first `sent` records.
    pub fn complete_flush(&mut self, sent: usize) {
        let sent = sent.min(self.pending.len());
        self.pending.drain(..sent);
        self.in_flight = false;
    }

    pub fn abort_flush(&mut self) {
        self.in_flight = false;
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight = false;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::TelemetrySample;

    fn point(rpm: f64) -> TripDataPoint {
        TripDataPoint::new(&TelemetrySample::with_rpm(Some(rpm)), None)
    }

    #[test]
    fn test_flush_due_at_batch_size() {
        let mut buffer = TripDataBuffer::new(3);
        assert!(!buffer.push(point(1.0)));
        assert!(!buffer.push(point(2.0)));
        assert!(buffer.push(point(3.0)));
    }

    #[test]
    fn test_successful_flush_empties() {
        let mut buffer = TripDataBuffer::new(2);
        buffer.push(point(1.0));
        buffer.push(point(2.0));

        let batch = buffer.begin_flush().unwrap();
        assert_eq!(batch.len(), 2);
        buffer.complete_flush(batch.len());
        assert!(buffer.is_empty());
        assert!(!buffer.is_flushing());
    }

    #[test]
    fn test_failed_flush_keeps_records() {
        let mut buffer = TripDataBuffer::new(2);
        buffer.push(point(1.0));
        buffer.push(point(2.0));

        let first = buffer.begin_flush().unwrap();
        buffer.abort_flush();
        assert_eq!(buffer.len(), 2);

        // retried on the next push, same records first, no duplicates
        assert!(buffer.push(point(3.0)));
        let retry = buffer.begin_flush().unwrap();
        assert_eq!(retry.len(), 3);
        assert_eq!(&retry[..2], &first[..]);
    }

    #[test]
    fn test_flush_is_not_reentrant() {
        let mut buffer = TripDataBuffer::new(1);
        buffer.push(point(1.0));
        assert!(buffer.begin_flush().is_some());
        assert!(buffer.begin_flush().is_none());
    }

    #[test]
    fn test_records_pushed_during_flight_survive() {
        let mut buffer = TripDataBuffer::new(2);
        buffer.push(point(1.0));
        buffer.push(point(2.0));
        let batch = buffer.begin_flush().unwrap();

        buffer.push(point(3.0));
        buffer.complete_flush(batch.len());

        assert_eq!(buffer.len(), 1);
        let rest = buffer.begin_flush().unwrap();
        assert_eq!(rest[0].rpm, Some(3.0));
    }

    #[test]
    fn test_empty_buffer_has_nothing_to_flush() {
        let mut buffer = TripDataBuffer::new(10);
        assert!(buffer.begin_flush().is_none());
        assert!(!buffer.is_flushing());
    }
}
