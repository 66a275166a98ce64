//! Wires capture, queue, assembler and detector together and owns shutdown.

use crate::audio::recorder::AudioSource;
use crate::config::Config;
use crate::error::{HoldwatchError, Result};
use crate::pipeline::assembler::{AssemblerConfig, ChunkAssembler};
use crate::pipeline::clock::{Clock, SystemClock};
use crate::pipeline::detector::{PhraseDetector, PhraseRules};
use crate::pipeline::gain::{GainController, GainLevels};
use crate::pipeline::producer::CaptureProducer;
use crate::pipeline::queue::{FrameQueue, OverflowPolicy};
use crate::pipeline::stats::{PipelineStats, StatsSnapshot};
use crate::pipeline::types::AudioFormat;
use crate::stt::transcriber::Transcriber;
use crate::volume::VolumeActuator;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Layout the audio source must deliver
    pub format: AudioFormat,
    /// Seconds of audio per chunk
    pub chunk_seconds: f64,
    /// Staleness limit between capture and dequeue
    pub max_delay: Duration,
    pub poll_timeout: Duration,
    pub overflow: OverflowPolicy,
    pub levels: GainLevels,
    pub activation_phrases: Vec<String>,
    pub deactivation_phrases: Vec<String>,
    /// Dump each chunk as WAV here before transcription
    pub save_chunks_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            format: AudioFormat::new(
                config.audio.sample_rate,
                config.audio.channels,
                config.audio.bytes_per_sample,
            ),
            chunk_seconds: config.chunking.chunk_seconds,
            max_delay: Duration::try_from_secs_f64(config.chunking.max_delay_seconds.max(0.0))
                .unwrap_or(Duration::MAX),
            poll_timeout: Duration::from_millis(config.chunking.poll_timeout_ms),
            overflow: OverflowPolicy::from_max_frames(config.chunking.max_queued_frames),
            levels: GainLevels {
                low: config.gain.low,
                high: config.gain.high,
            },
            activation_phrases: config.detection.activation_phrases.clone(),
            deactivation_phrases: config.detection.deactivation_phrases.clone(),
            save_chunks_dir: config.debug.save_chunks_dir.clone(),
        }
    }

    /// Accumulator threshold in bytes.
    pub fn chunk_bytes(&self) -> usize {
        self.format.bytes_for(self.chunk_seconds)
    }

    fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig {
            chunk_bytes: self.chunk_bytes(),
            max_delay: self.max_delay,
            poll_timeout: self.poll_timeout,
        }
    }
}

/// Handle to a running pipeline.
///
/// Dropping the handle shuts the pipeline down the same way [`stop`](Self::stop) does.
pub struct PipelineHandle {
    source: Box<dyn AudioSource>,
    producer: CaptureProducer,
    queue: FrameQueue,
    consumer: Option<JoinHandle<()>>,
    /// Cleared when the consumer thread exits
    running: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
}

impl PipelineHandle {
    /// Stops capture, lets the consumer finish its current chunk, and joins it.
    ///
    /// Capture stops before the sentinel is enqueued, so no frame lands behind it.
    pub fn stop(mut self) -> StatsSnapshot {
        self.shutdown();
        let snapshot = self.stats();
        log::info!("Pipeline stopped: {}", snapshot);
        snapshot
    }

    /// Returns true until the consumer thread has exited.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.queue.dropped())
    }

    pub fn source_name(&self) -> String {
        self.source.name()
    }

    fn shutdown(&mut self) {
        let Some(consumer) = self.consumer.take() else {
            return;
        };

        if let Err(e) = self.source.stop() {
            log::warn!("Failed to stop audio source {}: {}", self.source.name(), e);
        }
        self.producer.finish();

        if let Err(panic_info) = consumer.join() {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            log::error!("Consumer thread panicked: {}", msg);
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// AudioSource → FrameQueue → ChunkAssembler → PhraseDetector → VolumeActuator.
pub struct Pipeline {
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source used for capture stamps and staleness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Starts the pipeline.
    ///
    /// The actuator is driven to the LOW level before any audio is captured.
    ///
    /// # Errors
    /// `AudioFormatUnsupported` if the source's format differs from the
    /// configured one, or whatever the source returns from `start`. In both
    /// cases nothing is left running.
    pub fn start(
        self,
        mut source: Box<dyn AudioSource>,
        transcriber: Arc<dyn Transcriber>,
        actuator: Box<dyn VolumeActuator>,
    ) -> Result<PipelineHandle> {
        if source.format() != self.config.format {
            return Err(HoldwatchError::AudioFormatUnsupported {
                expected: self.config.format.to_string(),
                actual: source.format().to_string(),
            });
        }

        let stats = Arc::new(PipelineStats::new());
        let queue = FrameQueue::new(self.config.overflow);

        let gain = GainController::new(self.config.levels, actuator, stats.clone());
        let rules = PhraseRules::new(
            &self.config.activation_phrases[..],
            &self.config.deactivation_phrases[..],
        );
        let model = transcriber.model_name().to_string();
        let mut detector = PhraseDetector::new(transcriber, rules, gain, stats.clone());
        if let Some(dir) = &self.config.save_chunks_dir {
            detector = detector.with_chunk_dump(dir.clone(), self.config.format);
        }
        detector.reset_gain();

        let mut assembler =
            ChunkAssembler::new(self.config.assembler(), self.clock.clone(), stats.clone());

        let running = Arc::new(AtomicBool::new(true));
        let consumer_running = running.clone();
        let consumer_queue = queue.clone();
        let consumer = thread::Builder::new()
            .name("holdwatch-consumer".to_string())
            .spawn(move || {
                assembler.run(&consumer_queue, &mut detector);
                consumer_running.store(false, Ordering::SeqCst);
            })?;

        let producer = CaptureProducer::new(queue.clone(), self.clock.clone(), stats.clone());
        if let Err(e) = source.start(producer.clone()) {
            producer.finish();
            if consumer.join().is_err() {
                log::error!("Consumer thread panicked during failed startup");
            }
            return Err(e);
        }

        log::info!(
            "Listening on {} ({}), chunks of {:.1}s, model {}",
            source.name(),
            self.config.format,
            self.config.chunk_seconds,
            model
        );

        Ok(PipelineHandle {
            source,
            producer,
            queue,
            consumer: Some(consumer),
            running,
            stats,
        })
    }
}
