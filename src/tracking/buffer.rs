//! Sample buffer: ordered holding area for samples awaiting delivery
//!
//! Samples leave the buffer only through [`SampleBuffer::drain_all`]; every
//! drain must end either in a confirmed delivery (the batch is dropped) or in
//! [`SampleBuffer::requeue_front`], which puts the batch back ahead of anything
//! that arrived while it was away. Growth is unbounded: under permanent
//! delivery failure the buffer keeps every sample.

use std::collections::VecDeque;

use tracing::debug;

use crate::types::LocationSample;

/// FIFO of accepted samples, in acceptance order.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: VecDeque<LocationSample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample at the back.
    pub fn append(&mut self, sample: LocationSample) {
        self.samples.push_back(sample);
    }

    /// Take the entire contents, oldest first, leaving the buffer empty.
    pub fn drain_all(&mut self) -> Vec<LocationSample> {
        std::mem::take(&mut self.samples).into()
    }

    /// Put a previously drained batch back at the front, preserving its order.
    pub fn requeue_front(&mut self, batch: Vec<LocationSample>) {
        if batch.is_empty() {
            return;
        }

        let requeued = batch.len();
        let mut restored: VecDeque<LocationSample> = batch.into();
        restored.append(&mut self.samples);
        self.samples = restored;

        debug!(requeued, buffered = self.samples.len(), "Batch requeued at front of buffer");
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64) -> LocationSample {
        LocationSample {
            subject_id: "u1".to_string(),
            latitude: 40.0,
            longitude: -8.0,
            captured_at_millis: ts,
            accuracy_meters: 10.0,
            device_info: "test".to_string(),
        }
    }

    fn timestamps(buffer: &SampleBuffer) -> Vec<i64> {
        buffer.iter().map(|s| s.captured_at_millis).collect()
    }

    #[test]
    fn test_append_keeps_order() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample(3));
        buffer.append(sample(1));
        buffer.append(sample(2));

        // Acceptance order, not timestamp order
        assert_eq!(timestamps(&buffer), vec![3, 1, 2]);
    }

    #[test]
    fn test_drain_all_empties_buffer() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample(1));
        buffer.append(sample(2));

        let batch = buffer.drain_all();
        assert_eq!(batch.len(), 2);
        assert!(buffer.is_empty());
        assert!(buffer.drain_all().is_empty());
    }

    #[test]
    fn test_requeue_goes_ahead_of_newer_samples() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample(1));
        buffer.append(sample(2));

        let batch = buffer.drain_all();
        buffer.append(sample(3));
        buffer.requeue_front(batch);

        assert_eq!(timestamps(&buffer), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_samples_are_kept() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample(7));
        buffer.append(sample(7));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_requeue_empty_batch_is_noop() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample(1));
        buffer.requeue_front(Vec::new());
        assert_eq!(timestamps(&buffer), vec![1]);
    }
}
