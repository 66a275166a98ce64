//! End-to-end behaviour of the capture → chunk → transcribe → gain pipeline.

use holdwatch::audio::wav::encode_wav;
use holdwatch::audio::{MockAudioSource, WavAudioSource};
use holdwatch::pipeline::{
    AssemblerConfig, AudioFormat, AudioFrame, ChunkAssembler, Dequeued, FrameOutcome, FrameQueue,
    Pipeline, PipelineConfig, PipelineHandle, PipelineStats, SystemClock,
};
use holdwatch::stt::MockTranscriber;
use holdwatch::volume::RecordingActuator;
use holdwatch::{AudioSource, HoldwatchError};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn mono_16k() -> AudioFormat {
    AudioFormat::new(16000, 1, 2)
}

/// 320-byte chunks.
fn small_config() -> PipelineConfig {
    PipelineConfig {
        format: mono_16k(),
        chunk_seconds: 0.01,
        poll_timeout: Duration::from_millis(20),
        ..Default::default()
    }
}

fn wait_for_exit(handle: &PipelineHandle) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while handle.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!handle.is_running(), "pipeline did not finish in time");
}

fn run_to_end(
    chunks: usize,
    transcriber: MockTranscriber,
) -> (RecordingActuator, holdwatch::StatsSnapshot) {
    let actuator = RecordingActuator::new();
    let config = small_config();
    let source = MockAudioSource::new(mono_16k())
        .with_silence(chunks, config.chunk_bytes())
        .with_finish();

    let handle = Pipeline::new(config)
        .start(
            Box::new(source),
            Arc::new(transcriber),
            Box::new(actuator.clone()),
        )
        .unwrap();
    wait_for_exit(&handle);
    (actuator, handle.stop())
}

fn assembler(chunk_bytes: usize, max_delay: Duration) -> (ChunkAssembler, Arc<PipelineStats>) {
    let stats = Arc::new(PipelineStats::new());
    let assembler = ChunkAssembler::new(
        AssemblerConfig {
            chunk_bytes,
            max_delay,
            poll_timeout: Duration::from_millis(10),
        },
        Arc::new(SystemClock),
        stats.clone(),
    );
    (assembler, stats)
}

#[test]
fn frames_arrive_in_capture_order_across_threads() {
    let queue = FrameQueue::unbounded();
    let producer_queue = queue.clone();

    let producer = thread::spawn(move || {
        for i in 0..1000u64 {
            assert!(producer_queue.enqueue(AudioFrame::new(vec![0; 8], Instant::now(), i)));
        }
        producer_queue.close();
    });

    let mut expected = 0u64;
    loop {
        match queue.dequeue(Duration::from_secs(1)) {
            Dequeued::Frame(frame) => {
                assert_eq!(frame.sequence, expected);
                expected += 1;
            }
            Dequeued::Sentinel => break,
            Dequeued::Timeout => panic!("producer stalled"),
        }
    }
    producer.join().unwrap();
    assert_eq!(expected, 1000);
}

#[test]
fn two_second_chunks_at_16khz_are_64000_bytes() {
    let config = PipelineConfig {
        format: mono_16k(),
        chunk_seconds: 2.0,
        ..Default::default()
    };
    assert_eq!(config.chunk_bytes(), 64000);

    // 0.1s frames: a chunk closes on every 20th frame.
    let (mut assembler, stats) = assembler(config.chunk_bytes(), Duration::from_secs(10));
    let mut chunks = Vec::new();
    for i in 0..50u64 {
        if let FrameOutcome::ChunkReady(chunk) =
            assembler.push_frame(AudioFrame::new(vec![0; 3200], Instant::now(), i))
        {
            chunks.push(chunk);
        }
    }

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.len() == 64000));
    assert_eq!(assembler.buffered_len(), 10 * 3200);
    assert_eq!(stats.snapshot(0).chunks_emitted, 2);
}

#[test]
fn stale_frame_discards_whole_accumulator() {
    let Some(twenty_seconds_ago) = Instant::now().checked_sub(Duration::from_secs(20)) else {
        return;
    };
    let (mut assembler, stats) = assembler(64000, Duration::from_secs(10));

    for i in 0..5u64 {
        assembler.push_frame(AudioFrame::new(vec![0; 3200], Instant::now(), i));
    }
    assert_eq!(assembler.buffered_len(), 16000);

    match assembler.push_frame(AudioFrame::new(vec![0; 3200], twenty_seconds_ago, 5)) {
        FrameOutcome::Purged {
            delay,
            dropped_bytes,
        } => {
            assert!(delay >= Duration::from_secs(20));
            assert_eq!(dropped_bytes, 19200);
        }
        other => panic!("Expected purge, got {:?}", other),
    }
    assert_eq!(assembler.buffered_len(), 0);

    // Accumulation restarts from empty.
    assembler.push_frame(AudioFrame::new(vec![0; 3200], Instant::now(), 6));
    assert_eq!(assembler.buffered_len(), 3200);
    assert_eq!(stats.snapshot(0).stale_purges, 1);
}

#[test]
fn slow_transcription_purges_backlog() {
    let actuator = RecordingActuator::new();
    let transcriber = MockTranscriber::new("slow")
        .with_response("hello")
        .with_delay(Duration::from_millis(300));
    let config = PipelineConfig {
        max_delay: Duration::from_millis(100),
        ..small_config()
    };
    let chunk_bytes = config.chunk_bytes();
    let source = MockAudioSource::new(mono_16k());

    let handle = Pipeline::new(config)
        .start(
            Box::new(source.clone()),
            Arc::new(transcriber.clone()),
            Box::new(actuator.clone()),
        )
        .unwrap();
    let producer = source.producer().unwrap();

    producer.on_buffer(&vec![0u8; chunk_bytes]);
    let deadline = Instant::now() + Duration::from_secs(5);
    while transcriber.call_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(transcriber.call_count(), 1);

    // Queued while the consumer is stuck in the first transcription.
    for _ in 0..4 {
        producer.on_buffer(&vec![0u8; chunk_bytes]);
    }

    let stats = handle.stop();
    assert!(stats.stale_purges >= 1, "expected a purge, got {}", stats);
    assert_eq!(stats.chunks_emitted as usize, transcriber.call_count());
    assert!(stats.chunks_emitted < 5);
}

#[test]
fn phrases_drive_gain_levels() {
    let transcriber = MockTranscriber::new("mock")
        .then_respond("please hold|did you know")
        .then_respond("hello, are you there")
        .then_respond("for more information");

    let (actuator, stats) = run_to_end(3, transcriber);

    // LOW at start, then one level per matched chunk.
    assert_eq!(actuator.levels(), vec![30, 30, 70, 30]);
    assert_eq!(stats.chunks_emitted, 3);
    assert_eq!(stats.transitions, 2);
}

#[test]
fn activation_wins_when_both_lists_match() {
    let transcriber = MockTranscriber::new("mock").then_respond("hello|did you know");
    let (actuator, _) = run_to_end(1, transcriber);
    assert_eq!(actuator.current(), Some(70));
}

#[test]
fn chunk_without_phrases_leaves_gain_alone() {
    let transcriber = MockTranscriber::new("mock")
        .then_respond("hello")
        .then_respond("music playing");
    let (actuator, stats) = run_to_end(2, transcriber);
    assert_eq!(actuator.levels(), vec![30, 70]);
    assert_eq!(stats.transitions, 1);
}

#[test]
fn transcription_failure_does_not_stop_pipeline() {
    let transcriber = MockTranscriber::new("mock")
        .then_fail()
        .then_respond("hello");
    let (actuator, stats) = run_to_end(2, transcriber);

    assert_eq!(stats.transcription_failures, 1);
    assert_eq!(actuator.levels(), vec![30, 70]);
}

#[test]
fn actuator_failure_does_not_stop_pipeline() {
    let actuator = RecordingActuator::failing();
    let config = small_config();
    let source = MockAudioSource::new(mono_16k())
        .with_silence(2, config.chunk_bytes())
        .with_finish();
    let transcriber = MockTranscriber::new("mock").with_response("hello");

    let handle = Pipeline::new(config)
        .start(
            Box::new(source),
            Arc::new(transcriber.clone()),
            Box::new(actuator.clone()),
        )
        .unwrap();
    wait_for_exit(&handle);
    let stats = handle.stop();

    assert_eq!(transcriber.call_count(), 2);
    assert_eq!(stats.chunks_emitted, 2);
    assert_eq!(actuator.levels(), vec![30, 70, 70]);
}

#[test]
fn stop_waits_for_in_flight_transcription() {
    let transcriber = MockTranscriber::new("slow")
        .with_response("hello")
        .with_delay(Duration::from_millis(200));
    let actuator = RecordingActuator::new();
    let config = small_config();
    let source = MockAudioSource::new(mono_16k()).with_silence(1, config.chunk_bytes());

    let handle = Pipeline::new(config)
        .start(
            Box::new(source.clone()),
            Arc::new(transcriber.clone()),
            Box::new(actuator.clone()),
        )
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while transcriber.call_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }

    let stats = handle.stop();
    // The chunk being transcribed at stop time still reaches the actuator.
    assert_eq!(stats.chunks_emitted, 1);
    assert_eq!(actuator.levels(), vec![30, 70]);
    assert!(!source.producer().unwrap().on_buffer(&[0u8; 4]));
}

#[test]
fn partial_chunk_at_shutdown_is_discarded() {
    let transcriber = MockTranscriber::new("mock").with_response("hello");
    let actuator = RecordingActuator::new();
    let source = MockAudioSource::new(mono_16k())
        .with_silence(1, 100)
        .with_finish();

    let handle = Pipeline::new(small_config())
        .start(
            Box::new(source),
            Arc::new(transcriber.clone()),
            Box::new(actuator.clone()),
        )
        .unwrap();
    wait_for_exit(&handle);
    let stats = handle.stop();

    assert_eq!(stats.frames_enqueued, 1);
    assert_eq!(stats.chunks_emitted, 0);
    assert_eq!(transcriber.call_count(), 0);
    assert_eq!(actuator.levels(), vec![30]);
}

#[test]
fn capture_start_failure_is_fatal() {
    let source = MockAudioSource::new(mono_16k())
        .with_start_failure()
        .with_error_message("BlackHole 2ch");

    let result = Pipeline::new(small_config()).start(
        Box::new(source),
        Arc::new(MockTranscriber::new("mock")),
        Box::new(RecordingActuator::new()),
    );
    assert!(matches!(
        result,
        Err(HoldwatchError::AudioDeviceNotFound { .. })
    ));
}

#[test]
fn wav_replay_runs_to_completion() {
    // One second of audio, fed in 0.1s buffers, cut into 0.25s chunks.
    let bytes = encode_wav(&vec![100i16; 16000], mono_16k()).unwrap();
    let source = WavAudioSource::from_reader(Box::new(Cursor::new(bytes)))
        .unwrap()
        .with_frame_samples(1600);
    assert!(source.is_finite());

    let actuator = RecordingActuator::new();
    let transcriber = MockTranscriber::new("mock").with_response("Hello?");
    let config = PipelineConfig {
        chunk_seconds: 0.25,
        ..small_config()
    };

    let handle = Pipeline::new(config)
        .start(
            Box::new(source),
            Arc::new(transcriber.clone()),
            Box::new(actuator.clone()),
        )
        .unwrap();
    wait_for_exit(&handle);
    let stats = handle.stop();

    assert_eq!(stats.frames_enqueued, 10);
    assert_eq!(stats.chunks_emitted, 3);
    assert_eq!(transcriber.call_count(), 3);
    assert_eq!(actuator.levels(), vec![30, 70, 70, 70]);
    assert_eq!(stats.transitions, 1);
}
