//! Background deletion of expired artifacts.

use std::sync::Arc;
use std::time::Duration;

use sheetanim_common::clock::{retention_cutoff, Clock};
use sheetanim_common::error::SheetResult;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::ArtifactStore;

/// Deletes entries older than `retention` from a store.
pub struct Reaper {
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl Reaper {
    pub fn new(store: Arc<dyn ArtifactStore>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Delete every expired entry once. Returns how many were removed.
    ///
    /// A failed delete is logged and skipped so one bad entry does not
    /// block the rest.
    pub fn sweep(&self) -> SheetResult<usize> {
        let cutoff = retention_cutoff(self.clock.as_ref(), self.retention);
        let expired = self.store.list_expired(cutoff)?;

        let mut removed = 0;
        for id in &expired {
            match self.store.delete(id) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(id = %id, error = %e, "Failed to reap artifact"),
            }
        }

        if removed > 0 {
            tracing::info!(
                store = self.store.name(),
                removed,
                cutoff = %cutoff,
                "Reaped expired artifacts"
            );
        }
        Ok(removed)
    }

    /// Run [`Reaper::sweep`] every `interval` on the tokio runtime until the
    /// returned handle is shut down. The first sweep runs immediately.
    pub fn spawn(self, interval: Duration) -> ReaperHandle {
        let reaper = Arc::new(self);
        let stop = Arc::new(Notify::new());
        let stop_signal = stop.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::debug!(interval_secs = interval.as_secs_f64(), "Reaper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let reaper = reaper.clone();
                        match tokio::task::spawn_blocking(move || reaper.sweep()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => tracing::warn!(error = %e, "Reaper sweep failed"),
                            Err(e) => tracing::warn!(error = %e, "Reaper sweep panicked"),
                        }
                    }
                    _ = stop_signal.notified() => break,
                }
            }

            tracing::debug!("Reaper stopped");
        });

        ReaperHandle { stop, task }
    }
}

/// Handle to a running reaper task.
pub struct ReaperHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop the reaper and wait for its task to finish.
    pub async fn shutdown(self) {
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Reaper task ended abnormally");
        }
    }
}
