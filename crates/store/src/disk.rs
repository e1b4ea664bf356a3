//! File-backed artifact store.
//!
//! Each artifact is one file named `<id>.artifact`:
//!
//! ```text
//! {"kind":"frames","created_at":"…","parts":[1234,1240]}\n
//! <part 0 bytes><part 1 bytes>…
//! ```
//!
//! Uploads and animations have a single part. Frame sets store one PNG per
//! frame. Files are written to a temporary name and hard-linked into place,
//! so the final name only ever refers to a complete file and a second
//! writer for the same key fails instead of overwriting.

use std::fs;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use sheetanim_common::clock::Clock;
use sheetanim_common::error::{SheetError, SheetResult};
use sheetanim_model::artifact::{Artifact, ArtifactId, ArtifactKind, StoredArtifact};
use sheetanim_model::frames::FrameSet;

const EXTENSION: &str = "artifact";

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    kind: ArtifactKind,
    created_at: DateTime<Utc>,
    parts: Vec<u64>,
}

/// Artifacts stored as files under one directory.
pub struct DiskStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl DiskStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> SheetResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "Opened disk store");
        Ok(Self { root, clock })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(format!("{id}.{EXTENSION}"))
    }

    fn temp_path_for(&self, id: &ArtifactId) -> PathBuf {
        let suffix: u32 = rand::random();
        self.root.join(format!(".{id}.{suffix:08x}.tmp"))
    }
}

fn serialize(artifact: &Artifact, created_at: DateTime<Utc>) -> SheetResult<Vec<u8>> {
    let parts: Vec<Vec<u8>> = match artifact {
        Artifact::Upload(bytes) | Artifact::Animation(bytes) => vec![bytes.clone()],
        Artifact::Frames(frames) => frames
            .iter()
            .map(|frame| -> SheetResult<Vec<u8>> {
                let mut png = Cursor::new(Vec::new());
                frame.write_to(&mut png, ImageFormat::Png)?;
                Ok(png.into_inner())
            })
            .collect::<SheetResult<Vec<_>>>()?,
    };

    let header = EntryHeader {
        kind: artifact.kind(),
        created_at,
        parts: parts.iter().map(|p| p.len() as u64).collect(),
    };

    let mut out = serde_json::to_vec(&header)?;
    out.push(b'\n');
    for part in parts {
        out.extend_from_slice(&part);
    }
    Ok(out)
}

fn deserialize(id: &ArtifactId, bytes: &[u8]) -> SheetResult<StoredArtifact> {
    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| SheetError::store(format!("artifact {id} has no header")))?;
    let header: EntryHeader = serde_json::from_slice(&bytes[..newline])?;

    let mut parts = Vec::with_capacity(header.parts.len());
    let mut offset = newline + 1;
    for &len in &header.parts {
        let end = offset
            .checked_add(len as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| SheetError::store(format!("artifact {id} is truncated")))?;
        parts.push(&bytes[offset..end]);
        offset = end;
    }

    let single = |parts: &[&[u8]]| -> SheetResult<Vec<u8>> {
        match parts {
            [one] => Ok(one.to_vec()),
            _ => Err(SheetError::store(format!(
                "artifact {id} should have one part, found {}",
                parts.len()
            ))),
        }
    };

    let artifact = match header.kind {
        ArtifactKind::Upload => Artifact::Upload(single(&parts)?),
        ArtifactKind::Animation => Artifact::Animation(single(&parts)?),
        ArtifactKind::Frames => {
            let frames = parts
                .iter()
                .map(|p| image::load_from_memory_with_format(p, ImageFormat::Png))
                .collect::<Result<Vec<_>, _>>()?;
            Artifact::Frames(FrameSet::new(frames))
        }
    };

    Ok(StoredArtifact {
        id: id.clone(),
        created_at: header.created_at,
        artifact,
    })
}

fn read_header(path: &Path) -> io::Result<Option<EntryHeader>> {
    let file = fs::File::open(path)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    Ok(serde_json::from_str(line.trim_end()).ok())
}

impl crate::ArtifactStore for DiskStore {
    fn put(&self, id: &ArtifactId, artifact: Artifact) -> SheetResult<()> {
        let final_path = self.path_for(id);
        if final_path.exists() {
            return Err(SheetError::AlreadyExists {
                key: id.to_string(),
            });
        }

        let data = serialize(&artifact, self.clock.now())?;
        let temp_path = self.temp_path_for(id);
        fs::write(&temp_path, &data)?;

        let linked = fs::hard_link(&temp_path, &final_path);
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }
        match linked {
            Ok(()) => {
                tracing::debug!(id = %id, kind = ?artifact.kind(), bytes = data.len(), "Stored artifact on disk");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(SheetError::AlreadyExists {
                key: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &ArtifactId) -> SheetResult<Arc<StoredArtifact>> {
        let bytes = match fs::read(self.path_for(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SheetError::not_found(id.as_str()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Arc::new(deserialize(id, &bytes)?))
    }

    fn delete(&self, id: &ArtifactId) -> SheetResult<bool> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_expired(&self, cutoff: DateTime<Utc>) -> SheetResult<Vec<ArtifactId>> {
        let mut expired = vec![];
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| ArtifactId::parse(s).ok())
            else {
                continue;
            };

            match read_header(&path) {
                Ok(Some(header)) if header.created_at < cutoff => expired.push(id),
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(path = %path.display(), "Skipping artifact with unreadable header");
                }
                // Deleted between listing and reading.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        expired.sort();
        Ok(expired)
    }

    fn name(&self) -> &str {
        "disk"
    }
}
