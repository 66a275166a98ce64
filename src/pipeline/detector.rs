//! Transcribes chunks and turns trigger phrases into gain requests.

use crate::audio::wav::save_chunk_wav;
use crate::pipeline::assembler::ChunkSink;
use crate::pipeline::gain::{GainController, GainState};
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::types::{AudioFormat, Chunk, TranscriptSegment, joined_text};
use crate::stt::transcriber::Transcriber;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

/// A phrase found in a transcript and the state it requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseMatch<'a> {
    pub phrase: &'a str,
    pub state: GainState,
}

/// Ordered activation and deactivation phrase lists.
///
/// Matching is a case-insensitive substring test against each segment.
/// Activation phrases are tried first, in list order; deactivation phrases
/// only if none of them matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseRules {
    activation: Vec<String>,
    deactivation: Vec<String>,
}

impl PhraseRules {
    /// Empty phrases are skipped; they would match every transcript.
    pub fn new<A, D>(activation: &[A], deactivation: &[D]) -> Self
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        fn normalise<S: AsRef<str>>(phrases: &[S]) -> Vec<String> {
            phrases
                .iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect()
        }
        Self {
            activation: normalise(activation),
            deactivation: normalise(deactivation),
        }
    }

    pub fn activation(&self) -> &[String] {
        &self.activation
    }

    pub fn deactivation(&self) -> &[String] {
        &self.deactivation
    }

    pub fn classify(&self, segments: &[TranscriptSegment]) -> Option<PhraseMatch<'_>> {
        let texts: Vec<String> = segments.iter().map(|s| s.text.to_lowercase()).collect();
        let found = |phrase: &str| texts.iter().any(|t| t.contains(phrase));

        if let Some(phrase) = self.activation.iter().find(|p| found(p.as_str())) {
            return Some(PhraseMatch {
                phrase,
                state: GainState::High,
            });
        }
        self.deactivation
            .iter()
            .find(|p| found(p.as_str()))
            .map(|phrase| PhraseMatch {
                phrase,
                state: GainState::Low,
            })
    }
}

/// Consumer-side sink: transcribe, classify, actuate.
pub struct PhraseDetector {
    transcriber: Arc<dyn Transcriber>,
    rules: PhraseRules,
    gain: GainController,
    stats: Arc<PipelineStats>,
    dump: Option<(PathBuf, AudioFormat)>,
}

impl PhraseDetector {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        rules: PhraseRules,
        gain: GainController,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            transcriber,
            rules,
            gain,
            stats,
            dump: None,
        }
    }

    /// Write every chunk to `dir` as WAV before transcribing it.
    pub fn with_chunk_dump(mut self, dir: PathBuf, format: AudioFormat) -> Self {
        self.dump = Some((dir, format));
        self
    }

    pub fn gain_state(&self) -> GainState {
        self.gain.state()
    }

    /// Applies the starting state to the actuator.
    pub fn reset_gain(&mut self) {
        self.gain.apply(GainState::Low);
    }

    /// Handles one chunk and returns the state requested by it, if any.
    ///
    /// Transcription failures and panics count as "no phrase".
    pub fn process(&mut self, chunk: &Chunk) -> Option<GainState> {
        if let Some((dir, format)) = &self.dump {
            match save_chunk_wav(dir, chunk, *format) {
                Ok(path) => log::trace!("Saved chunk {} to {}", chunk.sequence, path.display()),
                Err(e) => log::warn!("Could not save chunk {}: {}", chunk.sequence, e),
            }
        }

        let segments = match self.transcribe(chunk) {
            Some(segments) => segments,
            None => {
                self.stats.record_transcription_failure();
                return None;
            }
        };

        log::debug!(
            "Chunk {} transcript: {:?}",
            chunk.sequence,
            joined_text(&segments)
        );

        let found = self.rules.classify(&segments)?;
        log::debug!("Matched {:?}, requesting {}", found.phrase, found.state);
        let state = found.state;
        self.gain.apply(state);
        Some(state)
    }

    fn transcribe(&self, chunk: &Chunk) -> Option<Vec<TranscriptSegment>> {
        let transcriber = &self.transcriber;
        match catch_unwind(AssertUnwindSafe(|| transcriber.transcribe(&chunk.bytes))) {
            Ok(Ok(segments)) => Some(segments),
            Ok(Err(e)) => {
                log::warn!("Transcription of chunk {} failed: {}", chunk.sequence, e);
                None
            }
            Err(_) => {
                log::warn!("Transcriber panicked on chunk {}", chunk.sequence);
                None
            }
        }
    }
}

impl ChunkSink for PhraseDetector {
    fn handle(&mut self, chunk: Chunk) {
        self.process(&chunk);
    }

    fn name(&self) -> &'static str {
        "phrase-detector"
    }
}
