//! Storycam application entry point.
//!
//! Composes the pipeline: record → select sharpest frame → request story →
//! queue and play narration, then runs it until shutdown.

use crate::capture::{FfmpegFrameExtractor, FfmpegRecorder, FrameExtractor, Recorder};
use crate::config::Config;
use crate::error::Result;
use crate::generator::{GenerationOrchestrator, GeneratorConfig};
use crate::playback::{AudioOutput, QueuePlayer};
use crate::story::{HttpStoryService, StaticWeather, StoryService, WeatherProvider};
use std::sync::Arc;
use std::time::Duration;

/// Apply CLI overrides on top of the loaded configuration.
pub fn apply_overrides(
    config: &mut Config,
    endpoint: Option<String>,
    device: Option<String>,
    interval_secs: Option<u64>,
) {
    if let Some(endpoint) = endpoint {
        config.story.endpoint = endpoint;
    }
    if let Some(device) = device {
        config.capture.device = device;
    }
    if let Some(secs) = interval_secs
        && secs > 0
    {
        config.capture.interval_secs = secs;
    }
}

fn build_output(config: &Config) -> Box<dyn AudioOutput> {
    #[cfg(feature = "cpal-audio")]
    {
        Box::new(
            crate::playback::CpalAudioOutput::new()
                .with_device(config.playback.output_device.clone()),
        )
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = config;
        Box::new(crate::playback::SilentAudioOutput::new())
    }
}

/// Run the pipeline: continuous mode until a shutdown signal, or a single
/// cycle when `once` is set.
pub async fn run_pipeline(
    mut config: Config,
    endpoint: Option<String>,
    device: Option<String>,
    interval_secs: Option<u64>,
    quiet: bool,
    verbose: u8,
    once: bool,
) -> Result<()> {
    // Suppress noisy JACK/ALSA warnings before any device probing
    #[cfg(feature = "cpal-audio")]
    crate::playback::suppress_audio_warnings();

    apply_overrides(&mut config, endpoint, device, interval_secs);

    let player = Arc::new(QueuePlayer::new(build_output(&config)));
    let recorder: Arc<dyn Recorder> = Arc::new(FfmpegRecorder::from_config(&config.capture));
    let extractor: Arc<dyn FrameExtractor> = Arc::new(FfmpegFrameExtractor::new());
    let story: Arc<dyn StoryService> = Arc::new(HttpStoryService::from_config(&config.story)?);
    let weather: Arc<dyn WeatherProvider> =
        Arc::new(StaticWeather::new(config.story.weather.clone()));

    let orchestrator = GenerationOrchestrator::new(
        recorder,
        extractor,
        story,
        weather,
        player.clone(),
        GeneratorConfig::from_config(&config),
    );

    // Rolling status printer
    let printer = if quiet {
        None
    } else {
        let mut status_rx = orchestrator.subscribe();
        Some(tokio::spawn(async move {
            let mut last = String::new();
            while status_rx.changed().await.is_ok() {
                let status = status_rx.borrow_and_update().clone();
                let line = if verbose >= 2 {
                    format!("[{:?}] {}", status.phase, status.message)
                } else {
                    status.message.clone()
                };
                if line != last {
                    eprintln!("storycam: {line}");
                    last = line;
                }
            }
        }))
    };

    if once {
        if let Err(e) = orchestrator.run_once().await {
            eprintln!("storycam: cycle failed: {e}");
        }
        // Let queued narration play out before exiting
        while player.is_active().await {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    } else {
        orchestrator.start_continuous();
        if !quiet {
            eprintln!(
                "storycam: continuous mode armed (every {}s), Ctrl-C to stop",
                config.capture.interval_secs
            );
        }

        wait_for_shutdown_signal(quiet).await;

        if !quiet {
            eprintln!("storycam: stopping, letting the in-flight cycle finish...");
        }
        orchestrator.shutdown().await;
    }

    player.shutdown().await;
    if let Some(printer) = printer {
        printer.abort();
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown_signal(quiet: bool) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\nstorycam: received SIGINT");
            }
        }
        _ = wait_for_sigterm() => {
            if !quiet {
                eprintln!("\nstorycam: received SIGTERM");
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            eprintln!("storycam: failed to register SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // On non-Unix, just wait forever (Ctrl+C will still work)
    std::future::pending::<()>().await;
}
