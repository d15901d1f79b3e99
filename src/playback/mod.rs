//! Narration playback: queue, controller, device output and coordination.

pub mod controller;
#[cfg(feature = "cpal-audio")]
pub mod device;
pub mod output;
pub mod player;
pub mod queue;

pub use controller::{PlaybackController, PlaybackEvent, PlaybackSnapshot, PlaybackState};
#[cfg(feature = "cpal-audio")]
pub use device::{CpalAudioOutput, list_output_devices, suppress_audio_warnings};
pub use output::{AudioOutput, MockAudioOutput, PcmAudio, SilentAudioOutput, decode_wav};
pub use player::{QueuePlayer, QueueSnapshot, TransportEvent};
pub use queue::{AudioQueue, AudioQueueItem};
