//! Animation encoding.

use std::borrow::Cow;

use image::RgbaImage;
use sheetanim_common::error::{EncodingError, SheetResult};
use sheetanim_model::animation::{AnimationSpec, LoopMode};
use sheetanim_model::frames::FrameSet;

use crate::palette::SharedPalette;

/// Longest frame duration a GIF can express (65535 centiseconds).
pub const MAX_FRAME_DURATION_MS: u32 = 655_350;

/// Largest canvas side a GIF can express.
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// Trait for animation output formats.
pub trait AnimationEncoder: Send + Sync {
    /// Encode the animation into a complete file.
    fn encode(&self, spec: AnimationSpec) -> SheetResult<Vec<u8>>;

    /// Encoder name.
    fn name(&self) -> &str;

    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &str;
}

/// Animated GIF output with one global palette.
///
/// Every frame replaces the previous one entirely (disposal "restore to
/// background") and shares the same delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct GifAnimationEncoder;

impl GifAnimationEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl AnimationEncoder for GifAnimationEncoder {
    fn encode(&self, spec: AnimationSpec) -> SheetResult<Vec<u8>> {
        let (width, height) = check_frames(&spec.frames)?;
        check_duration(spec.frame_duration_ms)?;
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(EncodingError::FrameTooLarge {
                width,
                height,
                limit: MAX_DIMENSION,
            }
            .into());
        }

        let frames: Vec<RgbaImage> = spec.frames.iter().map(|f| f.to_rgba8()).collect();
        let mut palette = SharedPalette::from_frames(&frames);
        let delay = delay_centis(spec.frame_duration_ms);
        let repeat = match spec.loop_mode {
            LoopMode::Infinite => gif::Repeat::Infinite,
            LoopMode::Finite(n) => gif::Repeat::Finite(n),
        };

        let mut out: Vec<u8> = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, width as u16, height as u16, palette.rgb())
                .map_err(gif_error)?;
            encoder.set_repeat(repeat).map_err(gif_error)?;

            for frame in &frames {
                let indices = palette.index_frame(frame);
                let gif_frame = gif::Frame {
                    width: width as u16,
                    height: height as u16,
                    delay,
                    dispose: gif::DisposalMethod::Background,
                    transparent: palette.transparent_index(),
                    buffer: Cow::Owned(indices),
                    ..gif::Frame::default()
                };
                encoder.write_frame(&gif_frame).map_err(gif_error)?;
            }
        }

        tracing::info!(
            frames = frames.len(),
            width,
            height,
            delay_cs = delay,
            colors = palette.len(),
            quantized = palette.is_quantized(),
            bytes = out.len(),
            "Encoded GIF"
        );

        Ok(out)
    }

    fn name(&self) -> &str {
        "gif"
    }

    fn extension(&self) -> &str {
        "gif"
    }
}

/// Check that a frame set is non-empty and uniform; returns the frame size.
pub fn check_frames(frames: &FrameSet) -> Result<(u32, u32), EncodingError> {
    let (expected_width, expected_height) =
        frames.frame_size().ok_or(EncodingError::EmptyFrameSet)?;
    if let Some(index) = frames.first_mismatch() {
        let found = &frames.frames()[index];
        return Err(EncodingError::NonUniformFrames {
            index,
            expected_width,
            expected_height,
            found_width: found.width(),
            found_height: found.height(),
        });
    }
    Ok((expected_width, expected_height))
}

pub fn check_duration(duration_ms: u32) -> Result<(), EncodingError> {
    if duration_ms == 0 || duration_ms > MAX_FRAME_DURATION_MS {
        return Err(EncodingError::InvalidDuration {
            duration_ms,
            max_ms: MAX_FRAME_DURATION_MS,
        });
    }
    Ok(())
}

/// Milliseconds to GIF centiseconds, rounded to nearest, at least 1.
pub fn delay_centis(duration_ms: u32) -> u16 {
    let cs = (duration_ms.saturating_add(5) / 10).max(1);
    u16::try_from(cs).unwrap_or(u16::MAX)
}

fn gif_error(err: gif::EncodingError) -> EncodingError {
    EncodingError::Gif {
        message: err.to_string(),
    }
}
