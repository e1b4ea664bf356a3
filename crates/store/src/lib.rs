//! Sheetanim Store
//!
//! A keyed artifact store hands results between pipeline stages that run
//! in separate calls (analyze now, convert later). Backends implement
//! [`ArtifactStore`]:
//!
//! - **Memory:** a map behind a lock, for tests and single-process use
//! - **Disk:** one file per artifact, published atomically
//!
//! The [`Reaper`] deletes entries older than a retention window on a
//! fixed interval.

pub mod disk;
pub mod memory;
pub mod reaper;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sheetanim_common::error::SheetResult;
use sheetanim_model::artifact::{Artifact, ArtifactId, StoredArtifact};

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use reaper::{Reaper, ReaperHandle};

/// Minimal key-value interface over stored artifacts.
///
/// Implementations must never expose a partially written entry: a `get`
/// racing a `put` or `delete` sees either the complete entry or
/// `NotFound`. Keys are written at most once.
pub trait ArtifactStore: Send + Sync {
    /// Store `artifact` under `id`, stamped with the store's clock.
    /// Fails with `AlreadyExists` if the key is taken.
    fn put(&self, id: &ArtifactId, artifact: Artifact) -> SheetResult<()>;

    /// Fetch a complete entry, or `NotFound`.
    fn get(&self, id: &ArtifactId) -> SheetResult<Arc<StoredArtifact>>;

    /// Remove an entry. Returns whether anything was removed.
    fn delete(&self, id: &ArtifactId) -> SheetResult<bool>;

    /// Keys of every entry created strictly before `cutoff`.
    fn list_expired(&self, cutoff: DateTime<Utc>) -> SheetResult<Vec<ArtifactId>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
