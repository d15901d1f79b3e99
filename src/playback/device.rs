//! Real audio output using CPAL (Cross-Platform Audio Library).

use crate::error::{Result, StorycamError};
use crate::playback::output::{AudioOutput, PcmAudio};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
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

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
///
/// # Safety
/// This modifies environment variables which is safe when called before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// List all available audio output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        host.output_devices()
    })
    .map_err(|e| StorycamError::PlaybackFailed {
        message: format!("failed to enumerate output devices: {e}"),
    })?;

    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

/// Shared state between the device callback and the controlling thread.
struct PlaybackBuffer {
    samples: Vec<f32>,
    cursor: AtomicUsize,
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed from a single thread at a time; its
/// methods are called synchronously and never cross thread boundaries.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Audio output backed by the system's output device.
#[derive(Default)]
pub struct CpalAudioOutput {
    device_name: Option<String>,
    stream: Option<SendableStream>,
    buffer: Option<Arc<PlaybackBuffer>>,
    sample_rate: u32,
    channels: u16,
}

impl CpalAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a specific output device by name (default: system default)
    pub fn with_device(mut self, name: Option<String>) -> Self {
        self.device_name = name;
        self
    }

    fn open_device(&self) -> Result<cpal::Device> {
        with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(ref wanted) = self.device_name {
                if let Ok(devices) = host.output_devices() {
                    for device in devices {
                        if device.name().is_ok_and(|name| &name == wanted) {
                            return Ok(device);
                        }
                    }
                }
                return Err(StorycamError::PlaybackFailed {
                    message: format!("output device not found: {wanted}"),
                });
            }

            host.default_output_device()
                .ok_or_else(|| StorycamError::PlaybackFailed {
                    message: "no default output device".to_string(),
                })
        })
    }
}

impl AudioOutput for CpalAudioOutput {
    fn start(&mut self, audio: PcmAudio) -> Result<()> {
        self.stop()?;

        let device = self.open_device()?;
        let config = cpal::StreamConfig {
            channels: audio.channels.max(1),
            sample_rate: cpal::SampleRate(audio.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let buffer = Arc::new(PlaybackBuffer {
            samples: audio.samples,
            cursor: AtomicUsize::new(0),
        });

        let callback_buffer = buffer.clone();
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let start = callback_buffer.cursor.fetch_add(out.len(), Ordering::SeqCst);
                    for (i, slot) in out.iter_mut().enumerate() {
                        *slot = callback_buffer.samples.get(start + i).copied().unwrap_or(0.0);
                    }
                },
                move |err| {
                    eprintln!("storycam: audio output error: {err}");
                },
                None,
            )
            .map_err(|e| StorycamError::PlaybackFailed {
                message: format!("output stream: {e}"),
            })?;

        stream.play().map_err(|e| StorycamError::PlaybackFailed {
            message: format!("stream start: {e}"),
        })?;

        self.sample_rate = config.sample_rate.0;
        self.channels = config.channels;
        self.buffer = Some(buffer);
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(ref stream) = self.stream {
            stream
                .0
                .pause()
                .map_err(|e| StorycamError::PlaybackFailed {
                    message: format!("pause: {e}"),
                })?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(ref stream) = self.stream {
            stream.0.play().map_err(|e| StorycamError::PlaybackFailed {
                message: format!("resume: {e}"),
            })?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stream = None;
        self.buffer = None;
        Ok(())
    }

    fn position(&self) -> Duration {
        let Some(ref buffer) = self.buffer else {
            return Duration::ZERO;
        };
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let consumed = buffer
            .cursor
            .load(Ordering::SeqCst)
            .min(buffer.samples.len());
        let frames = consumed / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn is_done(&self) -> bool {
        self.buffer
            .as_ref()
            .is_some_and(|buffer| buffer.cursor.load(Ordering::SeqCst) >= buffer.samples.len())
    }
}
