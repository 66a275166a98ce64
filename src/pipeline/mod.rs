//! Capture-to-gain pipeline.
//!
//! The capture callback hands raw buffers to a [`CaptureProducer`], which
//! stamps them and pushes them onto the [`FrameQueue`]. A single consumer
//! thread runs the [`ChunkAssembler`], which cuts fixed-size chunks and passes
//! each one to the [`PhraseDetector`]. The detector transcribes the chunk and
//! drives the [`GainController`].

pub mod assembler;
pub mod clock;
pub mod detector;
pub mod gain;
pub mod orchestrator;
pub mod producer;
pub mod queue;
pub mod stats;
pub mod types;

pub use assembler::{AssemblerConfig, ChunkAssembler, ChunkSink, FrameOutcome};
pub use clock::{Clock, SystemClock};
pub use detector::{PhraseDetector, PhraseMatch, PhraseRules};
pub use gain::{GainController, GainLevels, GainState};
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use producer::CaptureProducer;
pub use queue::{Dequeued, FrameQueue, OverflowPolicy};
pub use stats::{PipelineStats, StatsSnapshot};
pub use types::{AudioFormat, AudioFrame, Chunk, QueueItem, TranscriptSegment};
