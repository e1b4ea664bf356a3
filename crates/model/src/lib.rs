//! Sheetanim Data Model
//!
//! Defines the entities that flow through a sprite-sheet conversion:
//! - **SourceImage:** the decoded composite image, owned by one request
//! - **ProjectionProfile:** per-row or per-column mean luminance
//! - **GridHypothesis:** rows, columns, margin, and confidence of a grid
//! - **FrameSet / AnimationSpec:** ordered equal-sized frames and timing
//! - **Artifacts:** opaque ids and the payloads handed between stages
//!
//! Every entity is owned by the conversion request that created it;
//! nothing here is shared mutable state.

pub mod animation;
pub mod artifact;
pub mod frames;
pub mod grid;
pub mod profile;
pub mod source;

pub use animation::*;
pub use artifact::*;
pub use frames::*;
pub use grid::*;
pub use profile::*;
pub use source::*;
