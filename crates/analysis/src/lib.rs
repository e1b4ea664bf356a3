//! Sheetanim Grid Analysis
//!
//! Recovers the frame grid of a sprite sheet from raw pixels:
//! - **Projection:** mean luminance of every row and column
//! - **Valleys:** thin dark (or bright) bands that separate frames
//! - **Edges:** periodic brightness steps on sheets drawn without lines
//! - **Scoring:** named, weighted sub-scores combined into a confidence
//! - **Inference:** the row/column counts that best explain the bands
//!
//! This crate is pure computation. Inference never fails: when nothing
//! looks like a grid it returns a low-confidence fallback.

pub mod edges;
pub mod inference;
pub mod projection;
pub mod scoring;
pub mod valleys;

pub use inference::{DetectionMethod, GridInferencer, Inference};
pub use projection::{project, Projections};
pub use scoring::SubScores;
