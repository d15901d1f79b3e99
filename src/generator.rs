//! The capture-to-narration cycle state machine.
//!
//! One cycle runs record → extract → select → request → enqueue, phases
//! strictly in order. Continuous mode repeats cycles on a fixed interval;
//! a tick that fires while a cycle is still in flight is dropped, not
//! queued. Per-cycle failures are absorbed at the cycle boundary: they
//! update the rolling status and the next scheduled tick proceeds normally.

use crate::capture::{FrameExtractor, Recorder};
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, StorycamError};
use crate::playback::QueuePlayer;
use crate::scoring::FrameSelector;
use crate::story::{StoryService, WeatherProvider, story_date};
use base64::Engine;
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Where a cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Recording,
    ExtractingFrames,
    SelectingFrame,
    RequestingStory,
    EnqueueingAudio,
}

/// Point-in-time view of the orchestrator, published through a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorStatus {
    /// Continuous mode armed.
    pub running: bool,
    /// A cycle is in flight.
    pub busy: bool,
    /// Sequence number of the most recent cycle (monotonic from 1).
    pub generation_count: u64,
    pub phase: CyclePhase,
    /// Rolling human-readable status, latest phase or error.
    pub message: String,
    /// Most recent cycle error, cleared by the next successful cycle.
    pub last_error: Option<String>,
}

impl GeneratorStatus {
    pub fn idle() -> Self {
        Self {
            running: false,
            busy: false,
            generation_count: 0,
            phase: CyclePhase::Idle,
            message: "idle".to_string(),
            last_error: None,
        }
    }
}

/// Orchestrator timing and playback knobs.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Continuous-mode cycle interval.
    pub interval: Duration,
    /// Bound on the wait for a recorded clip.
    pub recording_timeout: Duration,
    /// Start playback when a cycle enqueues and nothing is playing.
    pub autoplay: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(defaults::CYCLE_INTERVAL_SECS),
            recording_timeout: Duration::from_secs(defaults::RECORDING_TIMEOUT_SECS),
            autoplay: true,
        }
    }
}

impl GeneratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.capture.interval_secs),
            recording_timeout: Duration::from_secs(config.capture.recording_timeout_secs),
            autoplay: config.playback.autoplay,
        }
    }
}

struct Inner {
    recorder: Arc<dyn Recorder>,
    extractor: Arc<dyn FrameExtractor>,
    selector: FrameSelector,
    story: Arc<dyn StoryService>,
    weather: Arc<dyn WeatherProvider>,
    player: Arc<QueuePlayer>,
    config: GeneratorConfig,
    running: AtomicBool,
    busy: AtomicBool,
    count: AtomicU64,
    status_tx: watch::Sender<GeneratorStatus>,
}

/// Drives repeated capture cycles and owns all pipeline state.
pub struct GenerationOrchestrator {
    inner: Arc<Inner>,
    loop_task: StdMutex<Option<JoinHandle<()>>>,
    stop_tx: StdMutex<Option<oneshot::Sender<()>>>,
}

impl GenerationOrchestrator {
    pub fn new(
        recorder: Arc<dyn Recorder>,
        extractor: Arc<dyn FrameExtractor>,
        story: Arc<dyn StoryService>,
        weather: Arc<dyn WeatherProvider>,
        player: Arc<QueuePlayer>,
        config: GeneratorConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(GeneratorStatus::idle());
        Self {
            inner: Arc::new(Inner {
                recorder,
                extractor,
                selector: FrameSelector::new(),
                story,
                weather,
                player,
                config,
                running: AtomicBool::new(false),
                busy: AtomicBool::new(false),
                count: AtomicU64::new(0),
                status_tx,
            }),
            loop_task: StdMutex::new(None),
            stop_tx: StdMutex::new(None),
        }
    }

    /// Subscribe to status snapshots.
    pub fn subscribe(&self) -> watch::Receiver<GeneratorStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn status(&self) -> GeneratorStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    pub fn generation_count(&self) -> u64 {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Arm continuous mode: cycle 1 begins immediately, then a repeating
    /// timer starts a cycle on each tick unless one is still in flight.
    ///
    /// No-op when already running. Must be called within a Tokio runtime.
    pub fn start_continuous(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.count.store(0, Ordering::SeqCst);
        self.inner.status_tx.send_modify(|s| {
            s.running = true;
            s.generation_count = 0;
            s.last_error = None;
            s.message = "continuous mode started".to_string();
        });

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        if let Ok(mut guard) = self.stop_tx.lock() {
            *guard = Some(stop_tx);
        }

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.interval);
            // Ticks missed while a cycle runs are dropped, never queued
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !inner.running.load(Ordering::SeqCst) {
                            break;
                        }
                        if inner.busy.swap(true, Ordering::SeqCst) {
                            // Previous cycle still in flight: drop this tick
                            continue;
                        }
                        let seq = inner.count.fetch_add(1, Ordering::SeqCst) + 1;
                        let outcome = run_cycle(&inner, seq).await;
                        finish_cycle(&inner, &outcome);
                        inner.busy.store(false, Ordering::SeqCst);
                    }
                    _ = &mut stop_rx => break,
                }
            }
            inner.status_tx.send_modify(|s| {
                s.running = false;
                s.busy = false;
                s.phase = CyclePhase::Idle;
            });
        });

        if let Ok(mut guard) = self.loop_task.lock() {
            *guard = Some(handle);
        }
    }

    /// Manual trigger; arms the same continuous loop.
    pub fn generate(&self) {
        self.start_continuous();
    }

    /// Disarm the timer. The in-flight cycle, if any, finishes on its own.
    ///
    /// No-op when not running.
    pub fn stop_continuous(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut guard) = self.stop_tx.lock()
            && let Some(tx) = guard.take()
        {
            let _ = tx.send(());
        }
        self.inner
            .status_tx
            .send_modify(|s| s.running = false);
    }

    /// Run exactly one cycle outside continuous mode.
    ///
    /// Returns Ok(false) without doing anything when a cycle is already in
    /// flight, Ok(true) when the cycle succeeded, and the cycle's error
    /// otherwise. The error is also recorded in the status, like any cycle
    /// failure.
    pub async fn run_once(&self) -> Result<bool> {
        if self.inner.busy.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        let seq = self.inner.count.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = run_cycle(&self.inner, seq).await;
        finish_cycle(&self.inner, &outcome);
        self.inner.busy.store(false, Ordering::SeqCst);
        outcome.map(|_| true)
    }

    /// Disarm the timer and wait for the loop (and any in-flight cycle) to
    /// finish.
    pub async fn shutdown(&self) {
        self.stop_continuous();
        let handle = self
            .loop_task
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

fn set_phase(inner: &Inner, seq: u64, phase: CyclePhase, message: String) {
    inner.status_tx.send_modify(|s| {
        s.busy = true;
        s.generation_count = seq;
        s.phase = phase;
        s.message = message;
    });
}

fn finish_cycle(inner: &Inner, outcome: &Result<String>) {
    inner.status_tx.send_modify(|s| {
        s.busy = false;
        s.phase = CyclePhase::Idle;
        match outcome {
            Ok(message) => {
                s.message = message.clone();
                s.last_error = None;
            }
            Err(e) => {
                s.message = e.to_string();
                s.last_error = Some(e.to_string());
            }
        }
    });
}

/// One full capture-to-narration cycle. Any error ends the cycle cleanly;
/// the caller records it and the orchestrator keeps running.
async fn run_cycle(inner: &Arc<Inner>, seq: u64) -> Result<String> {
    set_phase(
        inner,
        seq,
        CyclePhase::Recording,
        format!("Cycle {seq}: recording clip"),
    );
    let clip = tokio::time::timeout(
        inner.config.recording_timeout,
        inner.recorder.record_clip(),
    )
    .await
    .map_err(|_| StorycamError::CaptureTimeout {
        secs: inner.config.recording_timeout.as_secs(),
    })??;

    set_phase(
        inner,
        seq,
        CyclePhase::ExtractingFrames,
        format!("Cycle {seq}: extracting frames"),
    );
    let mut frames = inner.extractor.extract_frames(&clip).await?;
    if frames.is_empty() {
        return Err(StorycamError::ExtractionFailed {
            message: "no frames extracted".to_string(),
        });
    }

    set_phase(
        inner,
        seq,
        CyclePhase::SelectingFrame,
        format!("Cycle {seq}: scoring {} frames", frames.len()),
    );
    // When every frame fails to score, fall back to the first one
    let best_index = inner
        .selector
        .select_best(&frames)
        .await
        .map(|(index, _)| index)
        .unwrap_or(0);
    let image = std::mem::take(&mut frames[best_index].data);
    drop(frames);

    set_phase(
        inner,
        seq,
        CyclePhase::RequestingStory,
        format!("Cycle {seq}: requesting story"),
    );
    let weather = inner
        .weather
        .describe()
        .await
        .unwrap_or_else(|_| defaults::DEFAULT_WEATHER.to_string());
    let date = story_date();
    let response = inner.story.request_story(&image, &weather, &date).await?;

    set_phase(
        inner,
        seq,
        CyclePhase::EnqueueingAudio,
        format!("Cycle {seq}: enqueueing narration"),
    );
    let multi = response.audio_files.len() > 1;
    let mut enqueued = 0usize;
    for (part, payload) in response.audio_files.iter().enumerate() {
        let audio = match base64::engine::general_purpose::STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                // A malformed payload skips that part only
                let error = StorycamError::AudioDecodeFailed {
                    message: e.to_string(),
                };
                inner
                    .status_tx
                    .send_modify(|s| s.last_error = Some(error.to_string()));
                continue;
            }
        };
        let title = if multi {
            format!("Story {seq} (part {})", part + 1)
        } else {
            format!("Story {seq}")
        };
        inner
            .player
            .enqueue(title, response.text.clone(), audio)
            .await;
        enqueued += 1;
    }

    if inner.config.autoplay && enqueued > 0 && !inner.player.is_active().await {
        // Playback failures surface through the player, not the cycle
        let _ = inner.player.play_next().await;
    }

    Ok(format!(
        "Cycle {seq}: story ready ({enqueued} narration{})",
        if enqueued == 1 { "" } else { "s" }
    ))
}
