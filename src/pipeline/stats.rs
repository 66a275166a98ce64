//! Lock-free pipeline counters, reported on shutdown.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the producer callback and the consumer thread.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_enqueued: AtomicU64,
    frames_rejected: AtomicU64,
    chunks_emitted: AtomicU64,
    stale_purges: AtomicU64,
    transcription_failures: AtomicU64,
    transitions: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.frames_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_chunk(&self) {
        self.chunks_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_purge(&self) {
        self.stale_purges.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transcription_failure(&self) {
        self.transcription_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy. `frames_dropped` comes from the queue.
    pub fn snapshot(&self, frames_dropped: u64) -> StatsSnapshot {
        StatsSnapshot {
            frames_enqueued: self.frames_enqueued.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_dropped,
            chunks_emitted: self.chunks_emitted.load(Ordering::Relaxed),
            stale_purges: self.stale_purges.load(Ordering::Relaxed),
            transcription_failures: self.transcription_failures.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub frames_enqueued: u64,
    /// Frames offered after shutdown began.
    pub frames_rejected: u64,
    /// Frames discarded by the overflow policy.
    pub frames_dropped: u64,
    pub chunks_emitted: u64,
    pub stale_purges: u64,
    pub transcription_failures: u64,
    /// Gain state changes (repeated requests for the current state excluded).
    pub transitions: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} dropped={} chunks={} purges={} stt_failures={} transitions={}",
            self.frames_enqueued,
            self.frames_dropped,
            self.chunks_emitted,
            self.stale_purges,
            self.transcription_failures,
            self.transitions
        )
    }
}
