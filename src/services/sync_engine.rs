use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::MAX_WORKERS;
use crate::errors::{Result, SyncError};
use crate::models::{DownloadOutcome, RemoteFileDescriptor};
use crate::services::content_index::ContentIndex;
use crate::services::download_worker::DownloadWorker;
use crate::services::remote::FileSource;
use crate::services::summary::SyncSummary;

#[derive(Clone, Debug)]
pub struct SyncReport {
    /// One entry per descriptor, in completion order.
    pub outcomes: Vec<DownloadOutcome>,
    pub summary: SyncSummary,
}

/// Mirrors one remote channel into one destination tree.
#[derive(Clone)]
pub struct SyncEngine {
    source: Arc<dyn FileSource>,
    destination: PathBuf,
    max_workers: usize,
}

impl SyncEngine {
    pub fn new(source: Arc<dyn FileSource>, destination: PathBuf, max_workers: usize) -> Self {
        Self {
            source,
            destination,
            max_workers: max_workers.clamp(1, MAX_WORKERS),
        }
    }

    /// Seeds a fresh index from what is already on disk.
    pub async fn build_index(&self) -> Result<ContentIndex> {
        let destination = self.destination.clone();
        let index = tokio::task::spawn_blocking(move || ContentIndex::scan_seed(&destination))
            .await
            .map_err(|err| SyncError::Task(format!("index scan task failed: {err}")))??;
        Ok(index)
    }

    /// Scans, lists and downloads. A listing failure aborts the run before
    /// any worker is started.
    pub async fn sync_channel(&self, channel_id: &str) -> Result<SyncReport> {
        let span = tracing::info_span!("sync", run_id = %Uuid::new_v4(), channel = %channel_id);
        async {
            let index = Arc::new(self.build_index().await?);
            tracing::info!("fetching file list for channel {}", channel_id);
            let descriptors = self.source.list_files(channel_id).await?;
            tracing::info!("found {} files in channel {}", descriptors.len(), channel_id);
            Ok::<_, SyncError>(self.run(index, descriptors).await)
        }
        .instrument(span)
        .await
    }

    /// Runs one worker per descriptor with at most `max_workers` in flight.
    pub async fn run(
        &self,
        index: Arc<ContentIndex>,
        descriptors: Vec<RemoteFileDescriptor>,
    ) -> SyncReport {
        let total = descriptors.len();
        tracing::info!(
            "starting downloads files={} workers={} destination={}",
            total,
            self.max_workers,
            self.destination.display()
        );

        let (tx, mut rx) = mpsc::channel::<DownloadOutcome>(total.clamp(1, 256));
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let worker = DownloadWorker::new(
            self.source.clone(),
            index.clone(),
            self.destination.clone(),
        );

        for descriptor in descriptors {
            let tx = tx.clone();
            let semaphore = semaphore.clone();
            let worker = worker.clone();

            tokio::spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let outcome = worker.run(&descriptor).await;
                    let _ = tx.send(outcome).await;
                }
                .instrument(tracing::Span::current()),
            );
        }

        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        if outcomes.len() < total {
            tracing::error!(
                "{} download tasks ended without reporting an outcome",
                total - outcomes.len()
            );
        }

        let summary = SyncSummary::from_outcomes(&outcomes);
        tracing::info!(
            "downloads complete written={} duplicates={} failed={} indexed={}",
            summary.written,
            summary.duplicates,
            summary.failed,
            index.len()
        );
        SyncReport { outcomes, summary }
    }
}
