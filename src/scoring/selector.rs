//! Concurrent best-frame selection.

use crate::capture::extractor::Frame;
use crate::defaults;
use crate::scoring::sharpness;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Picks the sharpest frame out of a candidate set.
///
/// Every frame is scored, at most `concurrency` at a time. The running best
/// is replaced only by a strictly greater score, in task completion order —
/// under concurrency, ties therefore go to whichever frame finished first.
/// That nondeterminism is accepted; scores in practice are continuous enough
/// that exact ties do not occur.
#[derive(Debug, Clone)]
pub struct FrameSelector {
    concurrency: usize,
}

impl FrameSelector {
    pub fn new() -> Self {
        Self {
            concurrency: defaults::SCORING_CONCURRENCY,
        }
    }

    /// Configure the number of simultaneous scoring tasks
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Score all frames and return the index and score of the sharpest one.
    ///
    /// A frame that fails to score is excluded from comparison but does not
    /// abort the others. Returns None for an empty set or when every frame
    /// failed to score; the caller decides the fallback (first frame).
    pub async fn select_best(&self, frames: &[Frame]) -> Option<(usize, f64)> {
        if frames.is_empty() {
            return None;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, frame) in frames.iter().enumerate() {
            let data = frame.data.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                // Semaphore is never closed while tasks hold it
                let _permit = semaphore.acquire_owned().await.ok()?;
                let scored = tokio::task::spawn_blocking(move || sharpness::score_frame(&data))
                    .await
                    .ok()?;
                scored.ok().map(|score| (index, score))
            });
        }

        let mut best: Option<(usize, f64)> = None;
        while let Some(joined) = tasks.join_next().await {
            let Ok(Some((index, score))) = joined else {
                continue;
            };
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }
        best
    }
}

impl Default for FrameSelector {
    fn default() -> Self {
        Self::new()
    }
}
