//! Capture-side entry point into the pipeline.
//!
//! The audio backend calls [`CaptureProducer::on_buffer`] from its real-time
//! thread once per hardware buffer. The call timestamps the bytes, pushes them
//! onto the [`FrameQueue`] and returns. It never blocks, logs, or touches the
//! transcriber.

use crate::audio::convert::i16_to_le_bytes;
use crate::pipeline::clock::Clock;
use crate::pipeline::queue::FrameQueue;
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::types::AudioFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cheap-to-clone handle given to an [`AudioSource`](crate::audio::recorder::AudioSource).
#[derive(Clone)]
pub struct CaptureProducer {
    queue: FrameQueue,
    clock: Arc<dyn Clock>,
    sequence: Arc<AtomicU64>,
    stats: Arc<PipelineStats>,
}

impl CaptureProducer {
    pub fn new(queue: FrameQueue, clock: Arc<dyn Clock>, stats: Arc<PipelineStats>) -> Self {
        Self {
            queue,
            clock,
            sequence: Arc::new(AtomicU64::new(0)),
            stats,
        }
    }

    /// Records one hardware buffer of raw PCM bytes.
    ///
    /// Returns `false` once the pipeline is shutting down.
    pub fn on_buffer(&self, bytes: &[u8]) -> bool {
        self.push(bytes.to_vec())
    }

    /// Records one hardware buffer of 16-bit samples as little-endian bytes.
    pub fn on_samples(&self, samples: &[i16]) -> bool {
        self.push(i16_to_le_bytes(samples))
    }

    fn push(&self, bytes: Vec<u8>) -> bool {
        let captured_at = self.clock.now();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        if self
            .queue
            .enqueue(AudioFrame::new(bytes, captured_at, sequence))
        {
            self.stats.record_enqueued();
            true
        } else {
            self.stats.record_rejected();
            false
        }
    }

    /// Enqueues the shutdown sentinel. Safe to call from any thread, any
    /// number of times; only the first call enqueues.
    pub fn finish(&self) -> bool {
        self.queue.close()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_closed()
    }
}

impl std::fmt::Debug for CaptureProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureProducer")
            .field("queue", &self.queue)
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clock::SystemClock;
    use crate::pipeline::clock::mock::MockClock;
    use crate::pipeline::queue::Dequeued;
    use std::time::Duration;

    fn producer_with(clock: Arc<dyn Clock>) -> (CaptureProducer, FrameQueue, Arc<PipelineStats>) {
        let queue = FrameQueue::unbounded();
        let stats = Arc::new(PipelineStats::new());
        let producer = CaptureProducer::new(queue.clone(), clock, stats.clone());
        (producer, queue, stats)
    }

    #[test]
    fn test_on_buffer_timestamps_and_sequences() {
        let clock = MockClock::new();
        let (producer, queue, stats) = producer_with(Arc::new(clock.clone()));
        let t0 = clock.now();

        assert!(producer.on_buffer(&[1, 2]));
        clock.advance(Duration::from_millis(10));
        assert!(producer.on_buffer(&[3, 4]));

        let Dequeued::Frame(first) = queue.dequeue(Duration::from_millis(10)) else {
            panic!("expected frame");
        };
        let Dequeued::Frame(second) = queue.dequeue(Duration::from_millis(10)) else {
            panic!("expected frame");
        };

        assert_eq!(first.bytes, vec![1, 2]);
        assert_eq!(first.sequence, 0);
        assert_eq!(first.captured_at, t0);
        assert_eq!(second.sequence, 1);
        assert_eq!(second.captured_at, t0 + Duration::from_millis(10));
        assert_eq!(stats.snapshot(0).frames_enqueued, 2);
    }

    #[test]
    fn test_on_samples_serialises_little_endian() {
        let (producer, queue, _) = producer_with(Arc::new(SystemClock));
        producer.on_samples(&[1, -1]);

        let Dequeued::Frame(frame) = queue.dequeue(Duration::from_millis(10)) else {
            panic!("expected frame");
        };
        assert_eq!(frame.bytes, vec![0x01, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_finish_only_once_and_rejects_late_frames() {
        let (producer, queue, stats) = producer_with(Arc::new(SystemClock));
        let other = producer.clone();

        assert!(producer.finish());
        assert!(!other.finish());
        assert!(other.is_finished());
        assert!(!other.on_buffer(&[0, 0]));

        assert!(matches!(
            queue.dequeue(Duration::from_millis(10)),
            Dequeued::Sentinel
        ));
        assert!(queue.is_empty());
        assert_eq!(stats.snapshot(0).frames_rejected, 1);
    }

    #[test]
    fn test_clones_share_sequence() {
        let (producer, queue, _) = producer_with(Arc::new(SystemClock));
        let other = producer.clone();
        producer.on_buffer(&[0]);
        other.on_buffer(&[0]);

        let mut sequences = Vec::new();
        while let Dequeued::Frame(f) = queue.dequeue(Duration::from_millis(10)) {
            sequences.push(f.sequence);
        }
        assert_eq!(sequences, vec![0, 1]);
    }
}
