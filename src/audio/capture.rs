//! Live capture from a loopback input device using CPAL.
//!
//! System output is routed into a virtual input (BlackHole, Soundflower, a
//! PulseAudio monitor) and captured here at the configured format.

use crate::audio::convert::f32_to_i16;
use crate::audio::recorder::AudioSource;
use crate::error::{HoldwatchError, Result};
use crate::pipeline::producer::CaptureProducer;
use crate::pipeline::types::AudioFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL probing makes ALSA/JACK print harmless noise on some systems.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Index of the first pattern contained in `name`, case-insensitively.
fn pattern_rank(name: &str, patterns: &[String]) -> Option<usize> {
    let lower = name.to_lowercase();
    patterns
        .iter()
        .position(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
}

/// Picks a device name: exact `wanted` if given, else the device matching
/// the earliest pattern. Device order breaks ties.
fn select_device_name<'a>(
    names: &'a [String],
    wanted: Option<&str>,
    patterns: &[String],
) -> Option<&'a String> {
    if let Some(wanted) = wanted {
        return names.iter().find(|n| n.as_str() == wanted);
    }
    names
        .iter()
        .filter_map(|n| pattern_rank(n, patterns).map(|rank| (rank, n)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, n)| n)
}

fn input_devices() -> Result<Vec<(String, cpal::Device)>> {
    let (_host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let devices = devices.map_err(|e| HoldwatchError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    Ok(devices
        .filter_map(|device| device.name().ok().map(|name| (name, device)))
        .collect())
}

/// Input device names; loopback candidates are marked with "\[loopback\]".
pub fn list_devices(patterns: &[String]) -> Result<Vec<String>> {
    Ok(input_devices()?
        .into_iter()
        .map(|(name, _)| {
            if pattern_rank(&name, patterns).is_some() {
                format!("{} [loopback]", name)
            } else {
                name
            }
        })
        .collect())
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is created, paused and dropped only by the thread that
/// owns the `CpalAudioSource`; it is never shared.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

pub struct CpalAudioSource {
    name: String,
    device: cpal::Device,
    format: AudioFormat,
    stream: Option<SendableStream>,
}

impl CpalAudioSource {
    /// Finds the capture device.
    ///
    /// # Errors
    /// `AudioDeviceNotFound` if neither the exact name nor any pattern
    /// matches an input device. `AudioFormatUnsupported` for formats other
    /// than 16-bit.
    pub fn open(device: Option<&str>, patterns: &[String], format: AudioFormat) -> Result<Self> {
        if format.bytes_per_sample != 2 {
            return Err(HoldwatchError::AudioFormatUnsupported {
                expected: "16-bit capture".to_string(),
                actual: format.to_string(),
            });
        }

        let mut devices = input_devices()?;
        let names: Vec<String> = devices.iter().map(|(n, _)| n.clone()).collect();
        let chosen = select_device_name(&names, device, patterns)
            .cloned()
            .ok_or_else(|| HoldwatchError::AudioDeviceNotFound {
                device: match device {
                    Some(name) => name.to_string(),
                    None => format!("any of [{}]", patterns.join(", ")),
                },
            })?;

        let index = devices
            .iter()
            .position(|(n, _)| *n == chosen)
            .ok_or_else(|| HoldwatchError::AudioDeviceNotFound {
                device: chosen.clone(),
            })?;
        let (name, device) = devices.swap_remove(index);

        Ok(Self {
            name,
            device,
            format,
            stream: None,
        })
    }

    /// Builds an i16 stream, falling back to f32 for float-only devices.
    /// The data callback only hands the buffer to the producer.
    fn build_stream(&self, producer: CaptureProducer) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: self.format.channels,
            sample_rate: cpal::SampleRate(self.format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            log::error!("Audio stream error: {}", err);
        };

        let i16_producer = producer.clone();
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                i16_producer.on_samples(data);
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        log::debug!("{}: i16 stream unavailable, trying f32", self.name);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data.iter().copied().map(f32_to_i16).collect();
                    producer.on_samples(&samples);
                },
                err_callback,
                None,
            )
            .map_err(|e| HoldwatchError::AudioFormatUnsupported {
                expected: self.format.to_string(),
                actual: format!("device {} rejected the format: {}", self.name, e),
            })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self, producer: CaptureProducer) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = with_suppressed_stderr(|| self.build_stream(producer))?;
        stream.play().map_err(|e| HoldwatchError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.0.pause().map_err(|e| HoldwatchError::AudioCapture {
                message: format!("Failed to stop audio stream: {}", e),
            })?;
        }
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
