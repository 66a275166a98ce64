//! Data types flowing through the capture-to-chunk pipeline.

use std::fmt;
use std::time::{Duration, Instant};

/// PCM layout of the captured stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bytes_per_sample: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, bytes_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bytes_per_sample,
        }
    }

    /// Bytes in one interleaved sample frame (all channels).
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.bytes_per_sample as usize
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.frame_bytes()
    }

    /// Byte length of `seconds` of audio, rounded down to whole bytes.
    pub fn bytes_for(&self, seconds: f64) -> usize {
        (seconds * self.bytes_per_second() as f64).floor() as usize
    }

    /// Playback duration of `bytes` of audio.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let per_second = self.bytes_per_second();
        if per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / per_second as f64)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}-bit",
            self.sample_rate,
            self.channels,
            self.bytes_per_sample * 8
        )
    }
}

/// One hardware buffer of raw PCM as delivered by the capture callback.
///
/// Immutable once created; ownership moves into the queue on enqueue and
/// out of it exactly once on dequeue.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw PCM payload, interleaved, little-endian.
    pub bytes: Vec<u8>,
    /// When the producer received this buffer.
    pub captured_at: Instant,
    /// Sequence number assigned by the producer.
    pub sequence: u64,
}

impl AudioFrame {
    pub fn new(bytes: Vec<u8>, captured_at: Instant, sequence: u64) -> Self {
        Self {
            bytes,
            captured_at,
            sequence,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Entry carried by the frame queue.
#[derive(Debug)]
pub enum QueueItem {
    Frame(AudioFrame),
    /// Producer shutdown. The consumer stops at the first one it sees.
    Sentinel,
}

/// A fixed-duration slice of accumulated audio handed to the transcriber.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    /// Monotonic chunk counter, starting at 0.
    pub sequence: u64,
    /// Capture time of the frame that completed the chunk.
    pub completed_at: Instant,
}

impl Chunk {
    pub fn new(bytes: Vec<u8>, sequence: u64, completed_at: Instant) -> Self {
        Self {
            bytes,
            sequence,
            completed_at,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One piece of text returned by the transcription engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Joins segment texts for logging.
pub fn joined_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_sizes() {
        let format = AudioFormat::new(16000, 1, 2);
        assert_eq!(format.frame_bytes(), 2);
        assert_eq!(format.bytes_per_second(), 32000);
        assert_eq!(format.bytes_for(2.0), 64000);
    }

    #[test]
    fn test_audio_format_default_chunk() {
        // 3s at 44.1kHz mono 16-bit
        let format = AudioFormat::new(44100, 1, 2);
        assert_eq!(format.bytes_for(3.0), 264600);
    }

    #[test]
    fn test_audio_format_rounds_down_fractional_bytes() {
        let format = AudioFormat::new(44100, 1, 2);
        // 0.00001s * 88200 B/s = 0.882 bytes
        assert_eq!(format.bytes_for(0.00001), 0);
        assert_eq!(format.bytes_for(1.5), 132300);
    }

    #[test]
    fn test_audio_format_duration_of() {
        let format = AudioFormat::new(16000, 2, 2);
        assert_eq!(format.duration_of(64000), Duration::from_secs(1));
        assert_eq!(AudioFormat::new(0, 1, 2).duration_of(100), Duration::ZERO);
    }

    #[test]
    fn test_audio_format_display() {
        assert_eq!(AudioFormat::new(44100, 1, 2).to_string(), "44100Hz/1ch/16-bit");
    }

    #[test]
    fn test_audio_frame_creation() {
        let now = Instant::now();
        let frame = AudioFrame::new(vec![1, 2, 3, 4], now, 7);

        assert_eq!(frame.bytes, vec![1, 2, 3, 4]);
        assert_eq!(frame.captured_at, now);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.len(), 4);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_chunk_creation() {
        let now = Instant::now();
        let chunk = Chunk::new(vec![0; 10], 3, now);
        assert_eq!(chunk.len(), 10);
        assert_eq!(chunk.sequence, 3);
        assert_eq!(chunk.completed_at, now);
    }

    #[test]
    fn test_joined_text_skips_blank_segments() {
        let segments = vec![
            TranscriptSegment::new(" Hello"),
            TranscriptSegment::new("   "),
            TranscriptSegment::new("are you there? "),
        ];
        assert_eq!(joined_text(&segments), "Hello are you there?");
    }
}
