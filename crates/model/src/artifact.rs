//! Artifacts handed between pipeline stages through a keyed store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheetanim_common::clock::Clock;
use sheetanim_common::error::{SheetError, SheetResult};

use crate::frames::FrameSet;

const MAX_ID_LEN: usize = 64;

/// Opaque artifact key: creation timestamp plus a short random suffix.
///
/// The timestamp only keeps ids unique and sortable by eye; nothing reads
/// it back. Ids are restricted to `[A-Za-z0-9-]` so they are safe as file
/// names and URL segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Mint a fresh id stamped with the clock's current time.
    pub fn generate(clock: &dyn Clock) -> Self {
        let stamp = clock.now().format("%Y%m%d%H%M%S%3f");
        let suffix: u32 = rand::random();
        Self(format!("{stamp}-{suffix:08x}"))
    }

    /// Accept an id supplied by a caller, rejecting anything that is not
    /// a plausible key.
    pub fn parse(raw: &str) -> SheetResult<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(SheetError::not_found(raw));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = SheetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

/// Kind of payload stored under an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Uploaded sheet bytes awaiting conversion.
    Upload,
    /// Sliced frames.
    Frames,
    /// Encoded animation bytes.
    Animation,
}

/// A stored payload.
#[derive(Debug, Clone)]
pub enum Artifact {
    Upload(Vec<u8>),
    Frames(FrameSet),
    Animation(Vec<u8>),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Upload(_) => ArtifactKind::Upload,
            Self::Frames(_) => ArtifactKind::Frames,
            Self::Animation(_) => ArtifactKind::Animation,
        }
    }
}

/// A complete store entry: payload plus the time it was written.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub id: ArtifactId,
    pub created_at: DateTime<Utc>,
    pub artifact: Artifact,
}
