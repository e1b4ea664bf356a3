//! Error types shared across Sheetanim crates.

/// Top-level error type for Sheetanim operations.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    /// The input bytes could not be decoded as an image.
    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Artifact not found: {key}")]
    NotFound { key: String },

    #[error("Artifact already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SheetError.
pub type SheetResult<T> = Result<T, SheetError>;

impl SheetError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// NotFound is routine (expired or reaped artifacts), not a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A grid geometry that violates a slicing precondition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rows must be at least 1 (got 0)")]
    ZeroRows,

    #[error("cols must be at least 1 (got 0)")]
    ZeroCols,

    #[error("margin must be non-negative (got {margin})")]
    NegativeMargin { margin: i32 },

    #[error(
        "margin {margin} must be less than half the smaller cell dimension \
         (cell is {cell_width}x{cell_height})"
    )]
    MarginTooLarge {
        margin: i32,
        cell_width: u32,
        cell_height: u32,
    },
}

impl ValidationError {
    /// The violated constraint, suitable for display next to the offending input.
    pub fn constraint(&self) -> &'static str {
        match self {
            Self::ZeroRows => "rows >= 1",
            Self::ZeroCols => "cols >= 1",
            Self::NegativeMargin { .. } => "margin >= 0",
            Self::MarginTooLarge { .. } => "margin < min(cell_width, cell_height) / 2",
        }
    }
}

/// Failure to assemble frames into an animation.
///
/// Empty or non-uniform frame sets mean the slicer contract was broken
/// upstream and should be treated as a defect.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("frame set is empty")]
    EmptyFrameSet,

    #[error(
        "frame {index} is {found_width}x{found_height}, expected {expected_width}x{expected_height}"
    )]
    NonUniformFrames {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("frame duration must be between 1 and {max_ms} ms (got {duration_ms})")]
    InvalidDuration { duration_ms: u32, max_ms: u32 },

    #[error("frames of {width}x{height} exceed the format limit of {limit}x{limit}")]
    FrameTooLarge { width: u32, height: u32, limit: u32 },

    #[error("GIF encoding failed: {message}")]
    Gif { message: String },
}
