//! Queue/playback coordination.
//!
//! "Play next" is advance-then-play; "play previous" is retreat-then-play;
//! starting any item stops the one already playing. Finished and failed
//! items auto-advance to the next queue entry; an exhausted queue stops
//! playback and reports completion. All queue mutation funnels through one
//! async mutex so timer callbacks, finish notifications and user transport
//! actions cannot interleave mid-update.

use crate::error::Result;
use crate::playback::controller::{
    PlaybackController, PlaybackEvent, PlaybackSnapshot, PlaybackState,
};
use crate::playback::output::AudioOutput;
use crate::playback::queue::{AudioQueue, AudioQueueItem};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

/// UI-facing transport notifications, delivered non-blocking.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    TrackStarted { index: usize, title: String },
    QueueCompleted,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub titles: Vec<String>,
    pub current_index: Option<usize>,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Owns the audio queue and the playback controller.
pub struct QueuePlayer {
    queue: Arc<Mutex<AudioQueue>>,
    controller: Arc<Mutex<PlaybackController>>,
    next_item_id: AtomicU64,
    transport_tx: Option<crossbeam_channel::Sender<TransportEvent>>,
    event_loop: StdMutex<Option<JoinHandle<()>>>,
}

impl QueuePlayer {
    /// Create a player. Must be called within a Tokio runtime (spawns the
    /// auto-advance event loop).
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self::with_options(output, None)
    }

    /// Create a player that reports transport events to `transport_tx`.
    pub fn with_event_sender(
        output: Box<dyn AudioOutput>,
        transport_tx: crossbeam_channel::Sender<TransportEvent>,
    ) -> Self {
        Self::with_options(output, Some(transport_tx))
    }

    fn with_options(
        output: Box<dyn AudioOutput>,
        transport_tx: Option<crossbeam_channel::Sender<TransportEvent>>,
    ) -> Self {
        let (controller, event_rx) = PlaybackController::new(output);
        let queue = Arc::new(Mutex::new(AudioQueue::new()));
        let controller = Arc::new(Mutex::new(controller));

        let event_loop = tokio::spawn(Self::run_event_loop(
            queue.clone(),
            controller.clone(),
            event_rx,
            transport_tx.clone(),
        ));

        Self {
            queue,
            controller,
            next_item_id: AtomicU64::new(1),
            transport_tx,
            event_loop: StdMutex::new(Some(event_loop)),
        }
    }

    /// Reacts to terminal playback events by advancing the queue. A failed
    /// item is skipped the same way a finished one is.
    async fn run_event_loop(
        queue: Arc<Mutex<AudioQueue>>,
        controller: Arc<Mutex<PlaybackController>>,
        mut event_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
        transport_tx: Option<crossbeam_channel::Sender<TransportEvent>>,
    ) {
        while let Some(event) = event_rx.recv().await {
            match event {
                PlaybackEvent::Finished { .. } | PlaybackEvent::Failed { .. } => {
                    let _ = Self::advance_and_play(&queue, &controller, &transport_tx).await;
                }
            }
        }
    }

    /// Advance the cursor and play the new current item. An exhausted queue
    /// stops playback and reports completion.
    async fn advance_and_play(
        queue: &Arc<Mutex<AudioQueue>>,
        controller: &Arc<Mutex<PlaybackController>>,
        transport_tx: &Option<crossbeam_channel::Sender<TransportEvent>>,
    ) -> Result<()> {
        let mut q = queue.lock().await;
        match q.advance() {
            Ok(item) => {
                let item = item.clone();
                let index = q.current_index().unwrap_or(0);
                drop(q);

                controller.lock().await.play(&item)?;
                Self::emit(
                    transport_tx,
                    TransportEvent::TrackStarted {
                        index,
                        title: item.title,
                    },
                );
                Ok(())
            }
            Err(e) => {
                drop(q);
                controller.lock().await.stop();
                Self::emit(transport_tx, TransportEvent::QueueCompleted);
                Err(e)
            }
        }
    }

    fn emit(
        transport_tx: &Option<crossbeam_channel::Sender<TransportEvent>>,
        event: TransportEvent,
    ) {
        if let Some(tx) = transport_tx {
            let _ = tx.try_send(event);
        }
    }

    /// Append a narration to the queue; returns its assigned id.
    pub async fn enqueue(
        &self,
        title: impl Into<String>,
        story: impl Into<String>,
        audio: Vec<u8>,
    ) -> u64 {
        let id = self.next_item_id.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .await
            .append(AudioQueueItem::new(id, title, story, audio));
        id
    }

    /// Advance and play the next item.
    ///
    /// A decode/device failure returns the error without skipping ahead;
    /// the auto-advance loop handles the skip so the item is not jumped
    /// twice. `QueueExhausted` stops playback and reports completion.
    pub async fn play_next(&self) -> Result<()> {
        Self::advance_and_play(&self.queue, &self.controller, &self.transport_tx).await
    }

    /// Retreat and play the previous item.
    pub async fn play_previous(&self) -> Result<()> {
        let mut q = self.queue.lock().await;
        let item = q.retreat()?.clone();
        let index = q.current_index().unwrap_or(0);
        drop(q);

        self.controller.lock().await.play(&item)?;
        Self::emit(
            &self.transport_tx,
            TransportEvent::TrackStarted {
                index,
                title: item.title,
            },
        );
        Ok(())
    }

    /// Toggle between Playing and Paused; no-op in other states.
    pub async fn toggle_pause(&self) -> Result<()> {
        let mut controller = self.controller.lock().await;
        match controller.state() {
            PlaybackState::Playing => controller.pause(),
            PlaybackState::Paused => controller.resume(),
            _ => Ok(()),
        }
    }

    pub async fn pause(&self) -> Result<()> {
        self.controller.lock().await.pause()
    }

    pub async fn resume(&self) -> Result<()> {
        self.controller.lock().await.resume()
    }

    /// Stop playback, leaving the queue and cursor untouched.
    pub async fn stop(&self) {
        self.controller.lock().await.stop();
    }

    /// Remove the item at `index`.
    ///
    /// Removing the current item while something is loaded stops it and
    /// starts whatever the queue advanced to; when nothing remains, playback
    /// stops and completion is reported.
    pub async fn remove_at(&self, index: usize) -> Result<AudioQueueItem> {
        let mut q = self.queue.lock().await;
        let was_current = q.current_index() == Some(index);
        let removed = q.remove_at(index)?;

        if was_current {
            let next = q.current().cloned();
            let next_index = q.current_index();
            drop(q);

            let mut controller = self.controller.lock().await;
            let was_active = controller.is_active();
            controller.stop();

            if was_active {
                match (next, next_index) {
                    (Some(item), Some(idx)) => {
                        if controller.play(&item).is_ok() {
                            Self::emit(
                                &self.transport_tx,
                                TransportEvent::TrackStarted {
                                    index: idx,
                                    title: item.title,
                                },
                            );
                        }
                    }
                    _ => Self::emit(&self.transport_tx, TransportEvent::QueueCompleted),
                }
            }
        }

        Ok(removed)
    }

    /// Clear the queue and stop playback.
    pub async fn clear(&self) {
        self.queue.lock().await.clear();
        self.controller.lock().await.stop();
    }

    /// True while an item is playing or paused.
    pub async fn is_active(&self) -> bool {
        self.controller.lock().await.is_active()
    }

    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        let q = self.queue.lock().await;
        QueueSnapshot {
            titles: q.items().iter().map(|item| item.title.clone()).collect(),
            current_index: q.current_index(),
        }
    }

    pub async fn playback_snapshot(&self) -> PlaybackSnapshot {
        self.controller.lock().await.snapshot()
    }

    /// Subscribe to playback snapshots.
    pub async fn subscribe_playback(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.controller.lock().await.subscribe()
    }

    /// Stop playback and tear down the auto-advance loop.
    pub async fn shutdown(&self) {
        self.controller.lock().await.stop();
        if let Ok(mut guard) = self.event_loop.lock()
            && let Some(handle) = guard.take()
        {
            handle.abort();
        }
    }
}

impl Drop for QueuePlayer {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.event_loop.lock()
            && let Some(handle) = guard.take()
        {
            handle.abort();
        }
    }
}
