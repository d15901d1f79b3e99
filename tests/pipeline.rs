//! End-to-end pipeline tests: mock collaborators on every seam, real
//! orchestration, queue and playback in between.

use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use storycam::capture::{MockFrameExtractor, MockRecorder};
use storycam::playback::{MockAudioOutput, PlaybackState, QueuePlayer};
use storycam::story::{MockStoryService, MockWeather};
use storycam::{GenerationOrchestrator, GeneratorConfig};

fn png(gray: GrayImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn flat_frame() -> Vec<u8> {
    png(GrayImage::from_fn(16, 16, |_, _| image::Luma([96])))
}

fn sharp_frame() -> Vec<u8> {
    png(GrayImage::from_fn(16, 16, |x, y| {
        image::Luma([if (x + y) % 2 == 0 { 255 } else { 0 }])
    }))
}

fn narration_b64(millis: u64) -> String {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for _ in 0..(8 * millis) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
}

struct Pipeline {
    recorder: Arc<MockRecorder>,
    story: Arc<MockStoryService>,
    player: Arc<QueuePlayer>,
    orchestrator: GenerationOrchestrator,
}

fn pipeline(story: MockStoryService, config: GeneratorConfig) -> Pipeline {
    let recorder = Arc::new(MockRecorder::new());
    let story = Arc::new(story);
    let player = Arc::new(QueuePlayer::new(Box::new(MockAudioOutput::new())));
    let orchestrator = GenerationOrchestrator::new(
        recorder.clone(),
        Arc::new(MockFrameExtractor::new().with_frames(vec![
            flat_frame(),
            sharp_frame(),
            flat_frame(),
        ])),
        story.clone(),
        Arc::new(MockWeather::new("broken clouds")),
        player.clone(),
        config,
    );
    Pipeline {
        recorder,
        story,
        player,
        orchestrator,
    }
}

#[tokio::test]
async fn continuous_mode_produces_titled_narrations() {
    let p = pipeline(
        MockStoryService::new().with_story("A story.", vec![narration_b64(20)]),
        GeneratorConfig {
            interval: Duration::from_millis(60),
            autoplay: false,
            ..GeneratorConfig::default()
        },
    );

    p.orchestrator.start_continuous();
    tokio::time::sleep(Duration::from_millis(250)).await;
    p.orchestrator.shutdown().await;

    let queue = p.player.queue_snapshot().await;
    assert!(queue.len() >= 2, "expected several cycles, got {:?}", queue.titles);
    assert_eq!(queue.titles[0], "Story 1");
    assert_eq!(queue.titles[1], "Story 2");
    assert_eq!(p.recorder.max_concurrent(), 1);

    let status = p.orchestrator.status();
    assert!(!status.running);
    assert!(!status.busy);
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn single_cycle_plays_narration_to_completion() {
    let p = pipeline(
        MockStoryService::new().with_story("A short story.", vec![narration_b64(30)]),
        GeneratorConfig::default(),
    );

    assert!(p.orchestrator.run_once().await.unwrap());

    // Autoplay starts the narration; the sharpest frame went to the service
    assert_eq!(
        p.story.last_request().unwrap().image_len,
        sharp_frame().len()
    );
    assert_eq!(
        p.player.playback_snapshot().await.state,
        PlaybackState::Playing
    );

    // ~30ms of audio plays out and the queue completes
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(p.player.playback_snapshot().await.state, PlaybackState::Idle);
    assert_eq!(p.player.queue_snapshot().await.current_index, None);
}

#[tokio::test]
async fn failing_service_does_not_halt_continuous_mode() {
    let p = pipeline(
        MockStoryService::new()
            .with_failure()
            .with_error_message("HTTP 500 Internal Server Error"),
        GeneratorConfig {
            interval: Duration::from_millis(50),
            autoplay: false,
            ..GeneratorConfig::default()
        },
    );

    p.orchestrator.start_continuous();
    tokio::time::sleep(Duration::from_millis(220)).await;
    p.orchestrator.shutdown().await;

    // Cycles kept firing despite every one failing
    assert!(p.recorder.call_count() >= 2);
    assert!(p.player.queue_snapshot().await.is_empty());

    let status = p.orchestrator.status();
    assert!(status.last_error.as_deref().unwrap().contains("HTTP 500"));
    assert!(status.generation_count >= 2);
}
