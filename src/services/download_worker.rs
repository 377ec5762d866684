use std::path::PathBuf;
use std::sync::Arc;

use crate::models::{DownloadOutcome, RemoteFileDescriptor, SkipReason};
use crate::services::content_index::{ContentFingerprint, ContentIndex};
use crate::services::remote::FileSource;
use crate::utils::file::{bucket_for, sanitize_file_name, write_unique};

/// Runs fetch, hash, reserve, write and finalize for one descriptor.
#[derive(Clone)]
pub struct DownloadWorker {
    source: Arc<dyn FileSource>,
    index: Arc<ContentIndex>,
    destination: PathBuf,
}

impl DownloadWorker {
    pub fn new(source: Arc<dyn FileSource>, index: Arc<ContentIndex>, destination: PathBuf) -> Self {
        Self {
            source,
            index,
            destination,
        }
    }

    fn failed(descriptor: &RemoteFileDescriptor, reason: String) -> DownloadOutcome {
        DownloadOutcome::Failed {
            file_id: descriptor.id.clone(),
            reason,
        }
    }

    pub async fn run(&self, descriptor: &RemoteFileDescriptor) -> DownloadOutcome {
        tracing::info!(file_id = %descriptor.id, "downloading {}", descriptor.name);
        let Some(locator) = descriptor.locator() else {
            tracing::warn!(file_id = %descriptor.id, "no download url for {}", descriptor.name);
            return Self::failed(descriptor, "missing download url".to_string());
        };

        let content = match self.source.fetch(locator).await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(file_id = %descriptor.id, "fetch failed for {}: {}", descriptor.name, err);
                return Self::failed(descriptor, err.to_string());
            }
        };

        let fingerprint = ContentFingerprint::of(&content);
        tracing::debug!(
            file_id = %descriptor.id,
            "fetched {} bytes hash={}",
            content.len(),
            fingerprint.short()
        );

        if !self.index.try_reserve(&fingerprint) {
            let existing = self
                .index
                .lookup(&fingerprint)
                .and_then(|entry| entry.path().map(PathBuf::from));
            tracing::info!(
                file_id = %descriptor.id,
                "duplicate skipped: {} hash={} existing={}",
                descriptor.name,
                fingerprint.short(),
                existing
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "in progress".to_string())
            );
            return DownloadOutcome::Skipped {
                file_id: descriptor.id.clone(),
                reason: SkipReason::Duplicate { existing },
            };
        }

        let timestamp = descriptor.created_at();
        if timestamp.is_none() {
            tracing::warn!(file_id = %descriptor.id, "no timestamp for {}", descriptor.name);
        }
        let bucket = bucket_for(timestamp);
        let bucket_dir = self.destination.join(&bucket);
        let file_name = sanitize_file_name(&descriptor.name);

        // A failed write leaves the reservation in place for the rest of the run.
        let path = match write_unique(&bucket_dir, &file_name, &content).await {
            Ok(path) => path,
            Err(err) => {
                tracing::error!(
                    file_id = %descriptor.id,
                    "write failed for {} in {}: {}",
                    file_name,
                    bucket_dir.display(),
                    err
                );
                return Self::failed(descriptor, format!("write failed: {err}"));
            }
        };

        self.index.finalize(&fingerprint, path.clone());
        tracing::info!(file_id = %descriptor.id, "saved to {}", path.display());
        DownloadOutcome::Written {
            file_id: descriptor.id.clone(),
            path,
            timestamp,
        }
    }
}
