//! Sheetanim Render
//!
//! Turns a validated grid into pixels and pixels into an animation.
//!
//! # Pipeline
//!
//! ```text
//! SourceImage ──┐
//!               ├── slice (crop verbatim, row-major)
//! GridHypothesis┘         │
//!                         ▼
//!                     FrameSet ── shared palette ── GIF (loop forever)
//! ```

pub mod encoder;
pub mod palette;
pub mod slicer;

pub use encoder::{AnimationEncoder, GifAnimationEncoder};
pub use slicer::slice;
