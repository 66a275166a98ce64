//! Consumer loop: drains the frame queue into fixed-size chunks.
//!
//! For each frame, in order:
//! 1. append its bytes to the accumulator;
//! 2. if the frame is older than `max_delay`, discard the whole accumulator;
//! 3. otherwise, once the accumulator reaches `chunk_bytes`, emit it as one
//!    chunk and start over from empty.
//!
//! A chunk is cut at the first frame that crosses the threshold. Frames are
//! never split and the excess is not carried into the next chunk.

use crate::pipeline::clock::Clock;
use crate::pipeline::queue::{Dequeued, FrameQueue};
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::types::{AudioFrame, Chunk};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum gap between overflow warnings.
const DROP_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Receives each completed chunk on the consumer thread.
pub trait ChunkSink: Send + 'static {
    /// Must not panic; failures are handled inside the sink.
    fn handle(&mut self, chunk: Chunk);

    /// Name for logging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Accumulator size that triggers a chunk. Values below 1 are treated as 1.
    pub chunk_bytes: usize,
    /// Frames captured longer ago than this purge the accumulator.
    pub max_delay: Duration,
    /// How long one dequeue waits before retrying.
    pub poll_timeout: Duration,
}

/// What a single frame did to the accumulator.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Appended; still below the chunk threshold.
    Accumulated,
    /// The frame was stale and everything buffered was dropped.
    Purged { delay: Duration, dropped_bytes: usize },
    /// The threshold was reached.
    ChunkReady(Chunk),
}

pub struct ChunkAssembler {
    config: AssemblerConfig,
    buffer: Vec<u8>,
    next_sequence: u64,
    clock: Arc<dyn Clock>,
    stats: Arc<PipelineStats>,
    dropped_reported: u64,
    last_drop_warning: Option<Instant>,
}

impl ChunkAssembler {
    pub fn new(config: AssemblerConfig, clock: Arc<dyn Clock>, stats: Arc<PipelineStats>) -> Self {
        let config = AssemblerConfig {
            chunk_bytes: config.chunk_bytes.max(1),
            ..config
        };
        Self {
            buffer: Vec::new(),
            config,
            next_sequence: 0,
            clock,
            stats,
            dropped_reported: 0,
            last_drop_warning: None,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Bytes accumulated toward the next chunk.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Applies one frame to the accumulator.
    pub fn push_frame(&mut self, frame: AudioFrame) -> FrameOutcome {
        self.buffer.extend_from_slice(&frame.bytes);

        let delay = self.clock.now().saturating_duration_since(frame.captured_at);
        if delay > self.config.max_delay {
            let dropped_bytes = self.buffer.len();
            self.buffer.clear();
            self.stats.record_purge();
            log::warn!(
                "Audio is {:.1}s behind (limit {:.1}s), dropping {} buffered bytes",
                delay.as_secs_f64(),
                self.config.max_delay.as_secs_f64(),
                dropped_bytes
            );
            return FrameOutcome::Purged {
                delay,
                dropped_bytes,
            };
        }

        if self.buffer.len() >= self.config.chunk_bytes {
            let bytes = std::mem::take(&mut self.buffer);
            let chunk = Chunk::new(bytes, self.next_sequence, frame.captured_at);
            self.next_sequence += 1;
            self.stats.record_chunk();
            log::trace!("Chunk {} ready ({} bytes)", chunk.sequence, chunk.len());
            return FrameOutcome::ChunkReady(chunk);
        }

        FrameOutcome::Accumulated
    }

    /// Runs until the sentinel is dequeued, handing chunks to `sink`.
    ///
    /// Blocks only inside `dequeue`. Any partial accumulator left at the
    /// sentinel is discarded.
    pub fn run(&mut self, queue: &FrameQueue, sink: &mut dyn ChunkSink) {
        log::debug!(
            "Assembler started: chunk {} bytes, max delay {:?}, sink {}",
            self.config.chunk_bytes,
            self.config.max_delay,
            sink.name()
        );

        loop {
            self.report_overflow(queue);
            match queue.dequeue(self.config.poll_timeout) {
                Dequeued::Timeout => continue,
                Dequeued::Sentinel => break,
                Dequeued::Frame(frame) => {
                    if let FrameOutcome::ChunkReady(chunk) = self.push_frame(frame) {
                        sink.handle(chunk);
                    }
                }
            }
        }

        if !self.buffer.is_empty() {
            log::debug!(
                "Discarding {} bytes of partial chunk at shutdown",
                self.buffer.len()
            );
            self.buffer.clear();
        }
        log::debug!("Assembler stopped after {} chunks", self.next_sequence);
    }

    fn report_overflow(&mut self, queue: &FrameQueue) {
        let dropped = queue.dropped();
        if dropped <= self.dropped_reported {
            return;
        }
        let now = self.clock.now();
        let due = self
            .last_drop_warning
            .is_none_or(|last| now.saturating_duration_since(last) >= DROP_WARN_INTERVAL);
        if due {
            log::warn!(
                "Queue overflow: dropped {} oldest frames ({} total)",
                dropped - self.dropped_reported,
                dropped
            );
            self.dropped_reported = dropped;
            self.last_drop_warning = Some(now);
        }
    }
}
