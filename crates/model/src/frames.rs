//! Ordered frame sets.

use image::DynamicImage;

/// Frames cut from a sheet, in row-major order (top-left first).
///
/// Frames produced by the slicer all share one size and channel layout.
/// The type does not enforce that so an encoder can still reject a
/// malformed set built elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    frames: Vec<DynamicImage>,
}

impl FrameSet {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame by its 1-based external number.
    pub fn frame(&self, number: usize) -> Option<&DynamicImage> {
        number.checked_sub(1).and_then(|i| self.frames.get(i))
    }

    pub fn frames(&self) -> &[DynamicImage] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DynamicImage> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<DynamicImage> {
        self.frames
    }

    /// Size of the first frame.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width(), f.height()))
    }

    /// Whether any frame carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.frames.iter().any(|f| f.color().has_alpha())
    }

    /// Index (zero-based) of the first frame whose size differs from the first.
    pub fn first_mismatch(&self) -> Option<usize> {
        let (w, h) = self.frame_size()?;
        self.frames
            .iter()
            .position(|f| f.width() != w || f.height() != h)
    }

    pub fn is_uniform(&self) -> bool {
        self.first_mismatch().is_none()
    }

    /// Frame file name for a 1-based frame number (`frame_001.png`).
    pub fn file_name(number: usize) -> String {
        format!("frame_{number:03}.png")
    }
}

impl From<Vec<DynamicImage>> for FrameSet {
    fn from(frames: Vec<DynamicImage>) -> Self {
        Self::new(frames)
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a DynamicImage;
    type IntoIter = std::slice::Iter<'a, DynamicImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
