//! Two-step conversion backed by an artifact store.
//!
//! `analyze_upload` decodes and analyzes a sheet, stores the upload and
//! returns its id with the report. A later `convert` call picks the upload
//! up by id, applies the caller's grid edits and the configured defaults,
//! slices, encodes, stores the animation and returns the animation's id.
//! Entries older than the retention window are treated as gone even before
//! the reaper deletes them.

use std::sync::Arc;

use sheetanim_common::clock::{age_of, Clock, SystemClock};
use sheetanim_common::config::AppConfig;
use sheetanim_common::error::{SheetError, SheetResult};
use sheetanim_model::artifact::{Artifact, ArtifactId, StoredArtifact};
use sheetanim_model::grid::GridOverride;
use sheetanim_render::{AnimationEncoder, GifAnimationEncoder};
use sheetanim_store::{ArtifactStore, DiskStore, MemoryStore, Reaper};

use crate::job::ConversionJob;
use crate::ops::AnalysisReport;

/// Caller choices for a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertRequest {
    /// Edits to the inferred grid. Unset rows and columns keep the
    /// inferred value; an unset margin takes the configured default.
    pub grid: GridOverride,
    /// Per-frame display time; the configured default when unset.
    pub frame_duration_ms: Option<u32>,
}

pub struct ConversionService {
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    encoder: Arc<dyn AnimationEncoder>,
    config: AppConfig,
}

impl ConversionService {
    pub fn new(store: Arc<dyn ArtifactStore>, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
        Self {
            store,
            clock,
            encoder: Arc::new(GifAnimationEncoder::new()),
            config,
        }
    }

    /// A service whose artifacts live in process memory.
    pub fn in_memory(config: AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::new(clock.clone()));
        Self::new(store, clock, config)
    }

    /// A service whose artifacts live under `config.store_dir`.
    pub fn on_disk(config: AppConfig) -> SheetResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(DiskStore::open(&config.store_dir, clock.clone())?);
        Ok(Self::new(store, clock, config))
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn AnimationEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// A reaper over this service's store, using the configured retention.
    pub fn reaper(&self) -> Reaper {
        Reaper::new(self.store.clone(), self.clock.clone(), self.config.retention())
    }

    /// Analyze an uploaded sheet and keep it for a later `convert`.
    ///
    /// Undecodable bytes are rejected before anything is stored.
    pub fn analyze_upload(&self, bytes: Vec<u8>) -> SheetResult<(ArtifactId, AnalysisReport)> {
        let mut job = ConversionJob::from_bytes(&bytes)?;
        let report = job.analyze(&self.config.analysis)?.clone();

        let id = ArtifactId::generate(self.clock.as_ref());
        self.store.put(&id, Artifact::Upload(bytes))?;

        tracing::info!(
            id = %id,
            rows = report.rows,
            cols = report.cols,
            confidence = report.confidence,
            "Stored analyzed upload"
        );
        Ok((id, report))
    }

    /// Convert a stored upload into a stored animation.
    ///
    /// The upload is removed once the animation is stored.
    pub fn convert(&self, upload: &ArtifactId, request: ConvertRequest) -> SheetResult<ArtifactId> {
        let entry = self.fetch(upload)?;
        let Artifact::Upload(bytes) = &entry.artifact else {
            return Err(SheetError::not_found(upload.as_str()));
        };

        let mut job = ConversionJob::from_bytes(bytes)?;
        job.analyze(&self.config.analysis)?;
        let edits = GridOverride {
            margin: request.grid.margin.or(Some(self.config.defaults.margin)),
            ..request.grid
        };
        job.override_grid(edits)?;
        job.slice()?;

        let duration = request
            .frame_duration_ms
            .unwrap_or(self.config.defaults.frame_duration_ms);
        job.encode(self.encoder.as_ref(), duration)?;

        let output = job
            .into_output()
            .ok_or_else(|| SheetError::invalid_state("encoded job has no output"))?;
        let id = ArtifactId::generate(self.clock.as_ref());
        self.store.put(&id, Artifact::Animation(output))?;

        if let Err(e) = self.store.delete(upload) {
            tracing::warn!(id = %upload, error = %e, "Failed to remove converted upload");
        }

        tracing::info!(
            upload = %upload,
            animation = %id,
            duration_ms = duration,
            "Converted sheet"
        );
        Ok(id)
    }

    /// Fetch an entry that is still within the retention window.
    pub fn fetch(&self, id: &ArtifactId) -> SheetResult<Arc<StoredArtifact>> {
        let entry = self.store.get(id)?;
        if age_of(self.clock.as_ref(), entry.created_at) > self.config.retention() {
            tracing::debug!(id = %id, "Artifact past retention");
            return Err(SheetError::not_found(id.as_str()));
        }
        Ok(entry)
    }

    /// Fetch encoded animation bytes.
    pub fn fetch_animation(&self, id: &ArtifactId) -> SheetResult<Vec<u8>> {
        match &self.fetch(id)?.artifact {
            Artifact::Animation(bytes) => Ok(bytes.clone()),
            _ => Err(SheetError::not_found(id.as_str())),
        }
    }
}
