//! Laplacian-variance focus metric.
//!
//! The variance of a Laplacian-filtered grayscale image rises with
//! high-frequency edge content, making it a cheap proxy for focus quality:
//! a blurred frame flattens edges and its response variance collapses.

use crate::error::{Result, StorycamError};
use image::GrayImage;

/// Score encoded image bytes.
///
/// Decodes the image, converts to grayscale, and returns the variance of its
/// Laplacian response. Deterministic: the same bytes always produce the same
/// score. Undecodable input is a `ScoringFailed` error and the frame is
/// excluded from comparison.
pub fn score_frame(data: &[u8]) -> Result<f64> {
    let img = image::load_from_memory(data).map_err(|e| StorycamError::ScoringFailed {
        message: format!("image decode: {e}"),
    })?;
    Ok(laplacian_variance(&img.to_luma8()))
}

/// Variance of the 3x3 Laplacian response over interior pixels.
///
/// Kernel:
/// ```text
///  0 -1  0
/// -1  4 -1
///  0 -1  0
/// ```
/// with zero bias; `variance = mean(x^2) - mean(x)^2`. Images smaller than
/// 3x3 have no interior and score 0.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get_pixel(x, y)[0] as f64;
            let up = gray.get_pixel(x, y - 1)[0] as f64;
            let down = gray.get_pixel(x, y + 1)[0] as f64;
            let left = gray.get_pixel(x - 1, y)[0] as f64;
            let right = gray.get_pixel(x + 1, y)[0] as f64;

            let response = 4.0 * center - up - down - left - right;
            sum += response;
            sum_sq += response * response;
            count += 1;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    // Guard against tiny negative results from floating point cancellation
    (sum_sq / n - mean * mean).max(0.0)
}
