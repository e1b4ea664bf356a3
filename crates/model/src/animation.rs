//! Animation assembly parameters.

use crate::frames::FrameSet;

/// How many times an animation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Infinite,
    Finite(u16),
}

/// Frames plus uniform timing, consumed once by an encoder.
#[derive(Debug, Clone)]
pub struct AnimationSpec {
    pub frames: FrameSet,

    /// Display time of every frame in milliseconds.
    pub frame_duration_ms: u32,

    /// Sprite animations always loop forever.
    pub loop_mode: LoopMode,
}

impl AnimationSpec {
    /// An endlessly looping animation with one duration for every frame.
    pub fn looping(frames: FrameSet, frame_duration_ms: u32) -> Self {
        Self {
            frames,
            frame_duration_ms,
            loop_mode: LoopMode::Infinite,
        }
    }

    /// Length of one pass through all frames, in milliseconds.
    pub fn cycle_ms(&self) -> u64 {
        self.frames.len() as u64 * u64::from(self.frame_duration_ms)
    }
}
