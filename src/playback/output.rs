//! Audio output seam: decoded PCM and the device sink trait.

use crate::error::{Result, StorycamError};
use std::io::Cursor;
use std::time::{Duration, Instant};

/// Decoded PCM audio ready for an output device.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    /// Interleaved samples in [-1, 1].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    /// Total playback duration.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

/// Decode a WAV payload into PCM.
///
/// Integer samples are normalized to [-1, 1]. Malformed payloads are an
/// `AudioDecodeFailed` error.
pub fn decode_wav(bytes: &[u8]) -> Result<PcmAudio> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| StorycamError::AudioDecodeFailed {
            message: e.to_string(),
        })?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| StorycamError::AudioDecodeFailed {
                message: e.to_string(),
            })?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| StorycamError::AudioDecodeFailed {
                    message: e.to_string(),
                })?
        }
    };

    Ok(PcmAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Trait for audio output devices.
///
/// This trait allows swapping implementations (real device vs silent/mock).
/// One output plays at most one PCM buffer at a time; `start` replaces any
/// buffer already playing.
pub trait AudioOutput: Send {
    /// Begin playing a decoded buffer from the start.
    fn start(&mut self, audio: PcmAudio) -> Result<()>;

    /// Pause playback. No-op when nothing is playing.
    fn pause(&mut self) -> Result<()>;

    /// Resume paused playback. No-op when not paused.
    fn resume(&mut self) -> Result<()>;

    /// Stop playback and release the buffer.
    fn stop(&mut self) -> Result<()>;

    /// Elapsed playback position of the current buffer.
    fn position(&self) -> Duration;

    /// True once the current buffer has played to its end.
    fn is_done(&self) -> bool;
}

/// Output that plays nothing but advances in real time.
///
/// Used when the crate is built without a device backend, and as the clock
/// behind [`MockAudioOutput`]. Items "play" silently for their duration, so
/// queue advancement still works.
#[derive(Debug, Default)]
pub struct SilentAudioOutput {
    duration: Duration,
    played: Duration,
    playing_since: Option<Instant>,
    loaded: bool,
}

impl SilentAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOutput for SilentAudioOutput {
    fn start(&mut self, audio: PcmAudio) -> Result<()> {
        self.duration = audio.duration();
        self.played = Duration::ZERO;
        self.playing_since = Some(Instant::now());
        self.loaded = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(since) = self.playing_since.take() {
            self.played = (self.played + since.elapsed()).min(self.duration);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if self.loaded && self.playing_since.is_none() && !self.is_done() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.duration = Duration::ZERO;
        self.played = Duration::ZERO;
        self.playing_since = None;
        self.loaded = false;
        Ok(())
    }

    fn position(&self) -> Duration {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed())
            .unwrap_or(Duration::ZERO);
        (self.played + elapsed).min(self.duration)
    }

    fn is_done(&self) -> bool {
        self.loaded && self.position() >= self.duration
    }
}

/// Mock audio output for testing
#[derive(Debug, Default)]
pub struct MockAudioOutput {
    inner: SilentAudioOutput,
    should_fail_start: bool,
    error_message: String,
    start_count: u32,
}

impl MockAudioOutput {
    /// Create a new mock output with default settings
    pub fn new() -> Self {
        Self {
            inner: SilentAudioOutput::new(),
            should_fail_start: false,
            error_message: "mock output error".to_string(),
            start_count: 0,
        }
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Number of buffers started
    pub fn start_count(&self) -> u32 {
        self.start_count
    }
}

impl AudioOutput for MockAudioOutput {
    fn start(&mut self, audio: PcmAudio) -> Result<()> {
        if self.should_fail_start {
            return Err(StorycamError::PlaybackFailed {
                message: self.error_message.clone(),
            });
        }
        self.start_count += 1;
        self.inner.start(audio)
    }

    fn pause(&mut self) -> Result<()> {
        self.inner.pause()
    }

    fn resume(&mut self) -> Result<()> {
        self.inner.resume()
    }

    fn stop(&mut self) -> Result<()> {
        self.inner.stop()
    }

    fn position(&self) -> Duration {
        self.inner.position()
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }
}

/// Encode interleaved 16-bit PCM into an in-memory WAV. Test helper shared
/// across the playback and generator test suites.
#[cfg(test)]
pub(crate) fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wav_roundtrip() {
        let wav = encode_wav(&[0, 16384, -16384, 32767], 8000, 1);
        let pcm = decode_wav(&wav).unwrap();

        assert_eq!(pcm.sample_rate, 8000);
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.samples.len(), 4);
        assert!((pcm.samples[1] - 0.5).abs() < 1e-3);
        assert!((pcm.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_wav_rejects_garbage() {
        assert!(matches!(
            decode_wav(b"RIFFnope"),
            Err(StorycamError::AudioDecodeFailed { .. })
        ));
        assert!(matches!(
            decode_wav(&[]),
            Err(StorycamError::AudioDecodeFailed { .. })
        ));
    }

    #[test]
    fn test_pcm_duration() {
        let pcm = PcmAudio {
            samples: vec![0.0; 8000],
            sample_rate: 8000,
            channels: 1,
        };
        assert_eq!(pcm.duration(), Duration::from_secs(1));

        let stereo = PcmAudio {
            samples: vec![0.0; 8000],
            sample_rate: 8000,
            channels: 2,
        };
        assert_eq!(stereo.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_pcm_duration_degenerate() {
        let pcm = PcmAudio {
            samples: vec![0.0; 100],
            sample_rate: 0,
            channels: 1,
        };
        assert_eq!(pcm.duration(), Duration::ZERO);
    }

    fn short_pcm(millis: u64) -> PcmAudio {
        let frames = (8 * millis) as usize; // 8kHz mono
        PcmAudio {
            samples: vec![0.0; frames],
            sample_rate: 8000,
            channels: 1,
        }
    }

    #[test]
    fn test_silent_output_finishes() {
        let mut output = SilentAudioOutput::new();
        output.start(short_pcm(20)).unwrap();
        assert!(!output.is_done());

        std::thread::sleep(Duration::from_millis(40));
        assert!(output.is_done());
        assert_eq!(output.position(), short_pcm(20).duration());
    }

    #[test]
    fn test_silent_output_pause_freezes_position() {
        let mut output = SilentAudioOutput::new();
        output.start(short_pcm(500)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        output.pause().unwrap();

        let at_pause = output.position();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(output.position(), at_pause);
        assert!(!output.is_done());

        output.resume().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(output.position() > at_pause);
    }

    #[test]
    fn test_silent_output_stop_resets() {
        let mut output = SilentAudioOutput::new();
        output.start(short_pcm(500)).unwrap();
        output.stop().unwrap();
        assert_eq!(output.position(), Duration::ZERO);
        assert!(!output.is_done());
    }

    #[test]
    fn test_mock_output_start_failure() {
        let mut output = MockAudioOutput::new()
            .with_start_failure()
            .with_error_message("no device");

        match output.start(short_pcm(10)) {
            Err(StorycamError::PlaybackFailed { message }) => {
                assert_eq!(message, "no device");
            }
            other => panic!("Expected PlaybackFailed, got {:?}", other),
        }
        assert_eq!(output.start_count(), 0);
    }

    #[test]
    fn test_mock_output_counts_starts() {
        let mut output = MockAudioOutput::new();
        output.start(short_pcm(10)).unwrap();
        output.start(short_pcm(10)).unwrap();
        assert_eq!(output.start_count(), 2);
    }
}
