//! Clip recording and frame extraction.
//!
//! A [`Recorder`] produces one finite video clip per invocation; a
//! [`FrameExtractor`] lifts still frames out of it. Both are trait seams so
//! the pipeline can run against mocks in tests and against ffmpeg in
//! production.

pub mod extractor;
pub mod ffmpeg;
pub mod recorder;

pub use extractor::{Frame, FrameExtractor, MockFrameExtractor};
pub use ffmpeg::{FfmpegFrameExtractor, FfmpegRecorder};
pub use recorder::{MockRecorder, Recorder, VideoClip};
