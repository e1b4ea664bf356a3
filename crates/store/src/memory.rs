//! In-memory artifact store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use sheetanim_common::clock::{Clock, SystemClock};
use sheetanim_common::error::{SheetError, SheetResult};
use sheetanim_model::artifact::{Artifact, ArtifactId, StoredArtifact};

use crate::ArtifactStore;

/// Artifacts held in a map. Entries are immutable once inserted and handed
/// out as shared references, so readers never observe a partial entry.
pub struct MemoryStore {
    entries: RwLock<HashMap<ArtifactId, Arc<StoredArtifact>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

fn poisoned() -> SheetError {
    SheetError::store("memory store lock poisoned")
}

impl ArtifactStore for MemoryStore {
    fn put(&self, id: &ArtifactId, artifact: Artifact) -> SheetResult<()> {
        let kind = artifact.kind();
        let entry = Arc::new(StoredArtifact {
            id: id.clone(),
            created_at: self.clock.now(),
            artifact,
        });

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.contains_key(id) {
            return Err(SheetError::AlreadyExists {
                key: id.to_string(),
            });
        }
        entries.insert(id.clone(), entry);
        tracing::debug!(id = %id, ?kind, "Stored artifact in memory");
        Ok(())
    }

    fn get(&self, id: &ArtifactId) -> SheetResult<Arc<StoredArtifact>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| SheetError::not_found(id.as_str()))
    }

    fn delete(&self, id: &ArtifactId) -> SheetResult<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.remove(id).is_some())
    }

    fn list_expired(&self, cutoff: DateTime<Utc>) -> SheetResult<Vec<ArtifactId>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut expired: Vec<ArtifactId> = entries
            .values()
            .filter(|e| e.created_at < cutoff)
            .map(|e| e.id.clone())
            .collect();
        expired.sort();
        Ok(expired)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetanim_common::clock::ManualClock;
    use std::time::Duration;

    fn id(raw: &str) -> ArtifactId {
        ArtifactId::parse(raw).unwrap()
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::default();
        store.put(&id("a"), Artifact::Upload(vec![1, 2, 3])).unwrap();

        let entry = store.get(&id("a")).unwrap();
        assert!(matches!(&entry.artifact, Artifact::Upload(b) if b == &[1, 2, 3]));

        assert!(store.delete(&id("a")).unwrap());
        assert!(!store.delete(&id("a")).unwrap());
        assert!(store.get(&id("a")).unwrap_err().is_not_found());
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_are_written_once() {
        let store = MemoryStore::default();
        store.put(&id("k"), Artifact::Animation(vec![1])).unwrap();
        let err = store.put(&id("k"), Artifact::Animation(vec![2])).unwrap_err();
        assert!(matches!(err, SheetError::AlreadyExists { .. }));
        let entry = store.get(&id("k")).unwrap();
        assert!(matches!(&entry.artifact, Artifact::Animation(b) if b == &[1]));
    }

    #[test]
    fn test_list_expired_uses_creation_time() {
        let clock = ManualClock::starting_now();
        let store = MemoryStore::new(Arc::new(clock.clone()));

        store.put(&id("old"), Artifact::Upload(vec![])).unwrap();
        clock.advance(Duration::from_secs(600));
        let cutoff = clock.now();
        store.put(&id("new"), Artifact::Upload(vec![])).unwrap();

        assert_eq!(store.list_expired(cutoff).unwrap(), vec![id("old")]);
    }
}
