//! Sharpness scoring and best-frame selection.

pub mod selector;
pub mod sharpness;

pub use selector::FrameSelector;
pub use sharpness::{laplacian_variance, score_frame};
