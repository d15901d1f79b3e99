//! Single-item playback driver.
//!
//! Owns the output device, a 100 ms progress sampler, and the playback
//! state machine: Idle → Playing → {Paused, Finished, Failed}, with
//! Paused → Playing on resume. Finished/Failed are terminal for an item;
//! playing a new item starts over from Idle.

use crate::defaults;
use crate::error::{Result, StorycamError};
use crate::playback::output::{AudioOutput, decode_wav};
use crate::playback::queue::AudioQueueItem;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Finished,
    Failed,
}

/// Point-in-time view of playback, published through a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub item_id: Option<u64>,
    pub title: Option<String>,
    pub elapsed: Duration,
    pub duration: Duration,
    /// Elapsed over duration, in [0, 1].
    pub progress: f64,
}

impl PlaybackSnapshot {
    pub fn idle() -> Self {
        Self {
            state: PlaybackState::Idle,
            item_id: None,
            title: None,
            elapsed: Duration::ZERO,
            duration: Duration::ZERO,
            progress: 0.0,
        }
    }
}

/// Emitted when an item reaches a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Finished { item_id: u64 },
    Failed { item_id: u64, message: String },
}

/// Drives one audio item at a time through an [`AudioOutput`].
pub struct PlaybackController {
    output: Arc<Mutex<Box<dyn AudioOutput>>>,
    snapshot_tx: Arc<watch::Sender<PlaybackSnapshot>>,
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
    sampler: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Create a controller and the receiver for its terminal events.
    pub fn new(output: Box<dyn AudioOutput>) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(PlaybackSnapshot::idle());
        (
            Self {
                output: Arc::new(Mutex::new(output)),
                snapshot_tx: Arc::new(snapshot_tx),
                event_tx,
                sampler: None,
            },
            event_rx,
        )
    }

    /// Subscribe to playback snapshots.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.snapshot_tx.borrow().state
    }

    /// True while an item is loaded (playing or paused).
    pub fn is_active(&self) -> bool {
        matches!(self.state(), PlaybackState::Playing | PlaybackState::Paused)
    }

    /// Decode an item and begin playing it, replacing any current item.
    ///
    /// Must be called within a Tokio runtime (spawns the progress sampler).
    /// Decode and device failures transition to Failed and emit the matching
    /// event in addition to returning the error.
    pub fn play(&mut self, item: &AudioQueueItem) -> Result<()> {
        self.cancel_sampler();
        {
            let mut output = self.lock_output();
            let _ = output.stop();
        }

        let pcm = match decode_wav(&item.audio) {
            Ok(pcm) => pcm,
            Err(e) => {
                self.enter_failed(item, &e);
                return Err(e);
            }
        };
        let duration = pcm.duration();

        if let Err(e) = self.lock_output().start(pcm) {
            self.enter_failed(item, &e);
            return Err(e);
        }

        self.snapshot_tx.send_replace(PlaybackSnapshot {
            state: PlaybackState::Playing,
            item_id: Some(item.id),
            title: Some(item.title.clone()),
            elapsed: Duration::ZERO,
            duration,
            progress: 0.0,
        });

        let output = self.output.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        let event_tx = self.event_tx.clone();
        let item_id = item.id;
        self.sampler = Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(defaults::PROGRESS_INTERVAL_MS));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;

                let (position, done) = {
                    let Ok(guard) = output.lock() else { return };
                    (guard.position(), guard.is_done())
                };

                if done {
                    if let Ok(mut guard) = output.lock() {
                        let _ = guard.stop();
                    }
                    snapshot_tx.send_modify(|s| {
                        s.state = PlaybackState::Finished;
                        s.elapsed = s.duration;
                        s.progress = 1.0;
                    });
                    let _ = event_tx.send(PlaybackEvent::Finished { item_id });
                    return;
                }

                snapshot_tx.send_modify(|s| {
                    if s.state == PlaybackState::Playing {
                        s.elapsed = position;
                        s.progress = if s.duration.is_zero() {
                            0.0
                        } else {
                            (position.as_secs_f64() / s.duration.as_secs_f64()).min(1.0)
                        };
                    }
                });
            }
        }));

        Ok(())
    }

    /// Pause playback. No-op unless currently playing.
    pub fn pause(&mut self) -> Result<()> {
        if self.state() != PlaybackState::Playing {
            return Ok(());
        }
        self.lock_output().pause()?;
        self.snapshot_tx
            .send_modify(|s| s.state = PlaybackState::Paused);
        Ok(())
    }

    /// Resume paused playback. No-op unless currently paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.state() != PlaybackState::Paused {
            return Ok(());
        }
        self.lock_output().resume()?;
        self.snapshot_tx
            .send_modify(|s| s.state = PlaybackState::Playing);
        Ok(())
    }

    /// Cancel the sampler, release the device and return to Idle.
    pub fn stop(&mut self) {
        self.cancel_sampler();
        {
            let mut output = self.lock_output();
            let _ = output.stop();
        }
        self.snapshot_tx.send_replace(PlaybackSnapshot::idle());
    }

    fn enter_failed(&self, item: &AudioQueueItem, error: &StorycamError) {
        self.snapshot_tx.send_replace(PlaybackSnapshot {
            state: PlaybackState::Failed,
            item_id: Some(item.id),
            title: Some(item.title.clone()),
            elapsed: Duration::ZERO,
            duration: Duration::ZERO,
            progress: 0.0,
        });
        let _ = self.event_tx.send(PlaybackEvent::Failed {
            item_id: item.id,
            message: error.to_string(),
        });
    }

    fn cancel_sampler(&mut self) {
        if let Some(handle) = self.sampler.take() {
            handle.abort();
        }
    }

    fn lock_output(&self) -> MutexGuard<'_, Box<dyn AudioOutput>> {
        // The output mutex is never held across an await or panic point
        self.output
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.cancel_sampler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::output::{MockAudioOutput, encode_wav};

    fn wav_item(id: u64, millis: u64) -> AudioQueueItem {
        // 8kHz mono; `millis` of silence
        let samples = vec![0i16; (8 * millis) as usize];
        AudioQueueItem::new(id, format!("Story {id}"), "text", encode_wav(&samples, 8000, 1))
    }

    fn bad_item(id: u64) -> AudioQueueItem {
        AudioQueueItem::new(id, format!("Story {id}"), "text", b"not a wav".to_vec())
    }

    async fn recv_event(
        rx: &mut mpsc::UnboundedReceiver<PlaybackEvent>,
        within: Duration,
    ) -> Option<PlaybackEvent> {
        tokio::time::timeout(within, rx.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let (controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn test_play_transitions_to_playing() {
        let (mut controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        controller.play(&wav_item(1, 500)).unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.item_id, Some(1));
        assert_eq!(snapshot.title.as_deref(), Some("Story 1"));
        assert_eq!(snapshot.duration, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_natural_completion_emits_finished() {
        let (mut controller, mut rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        controller.play(&wav_item(7, 30)).unwrap();

        let event = recv_event(&mut rx, Duration::from_secs(2)).await;
        assert_eq!(event, Some(PlaybackEvent::Finished { item_id: 7 }));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Finished);
        assert_eq!(snapshot.progress, 1.0);
    }

    #[tokio::test]
    async fn test_malformed_payload_fails() {
        let (mut controller, mut rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));

        let result = controller.play(&bad_item(3));
        assert!(matches!(result, Err(StorycamError::AudioDecodeFailed { .. })));
        assert_eq!(controller.state(), PlaybackState::Failed);

        match recv_event(&mut rx, Duration::from_secs(1)).await {
            Some(PlaybackEvent::Failed { item_id, .. }) => assert_eq!(item_id, 3),
            other => panic!("Expected Failed event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_output_start_failure_fails() {
        let (mut controller, mut rx) =
            PlaybackController::new(Box::new(MockAudioOutput::new().with_start_failure()));

        let result = controller.play(&wav_item(4, 100));
        assert!(matches!(result, Err(StorycamError::PlaybackFailed { .. })));
        assert_eq!(controller.state(), PlaybackState::Failed);

        match recv_event(&mut rx, Duration::from_secs(1)).await {
            Some(PlaybackEvent::Failed { item_id, .. }) => assert_eq!(item_id, 4),
            other => panic!("Expected Failed event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let (mut controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        controller.play(&wav_item(1, 1000)).unwrap();

        controller.pause().unwrap();
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert!(controller.is_active());

        // Progress must not move while paused
        let before = controller.snapshot().elapsed;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.snapshot().elapsed, before);

        controller.resume().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_pause_when_idle_is_noop() {
        let (mut controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        assert!(controller.pause().is_ok());
        assert!(controller.resume().is_ok());
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_stop_returns_to_idle() {
        let (mut controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        controller.play(&wav_item(1, 1000)).unwrap();
        controller.stop();

        assert_eq!(controller.snapshot(), PlaybackSnapshot::idle());
    }

    #[tokio::test]
    async fn test_play_replaces_current_item() {
        let (mut controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        controller.play(&wav_item(1, 1000)).unwrap();
        controller.play(&wav_item(2, 1000)).unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.item_id, Some(2));
        assert_eq!(snapshot.state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_progress_advances_while_playing() {
        let (mut controller, _rx) = PlaybackController::new(Box::new(MockAudioOutput::new()));
        controller.play(&wav_item(1, 1000)).unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        let snapshot = controller.snapshot();
        assert!(snapshot.progress > 0.0, "progress should advance, got {snapshot:?}");
        assert!(snapshot.progress < 1.0);
    }
}
