// ─── File Synchronizer ───
// Brings an instance directory in line with the files its manifest lists.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::SyncOptions;
use crate::core::downloader::FileFetcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;
use crate::core::instance::ManifestFile;
use crate::core::retry::RetryPolicy;
use crate::core::verify::{self, HashAlgorithm};

pub const SYNC_TASK: &str = "Syncing Files";

const PERCENT_START: usize = 10;
const PERCENT_SPAN: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Client-side files the manifest asked for.
    pub total: usize,
    /// Already present with the right hash.
    pub verified: usize,
    /// Fetched during this run.
    pub downloaded: usize,
    /// Server-only entries that were ignored.
    pub skipped: usize,
}

enum FileOutcome {
    Verified,
    Downloaded,
}

pub struct FileSynchronizer {
    fetcher: Arc<dyn FileFetcher>,
    retry: RetryPolicy,
    events: EventBus,
    options: SyncOptions,
}

impl FileSynchronizer {
    pub fn new(
        fetcher: Arc<dyn FileFetcher>,
        retry: RetryPolicy,
        events: EventBus,
        options: SyncOptions,
    ) -> Self {
        Self {
            fetcher,
            retry,
            events,
            options,
        }
    }

    /// Verify every file and download the ones that are missing or differ.
    ///
    /// Files are processed in batches of `batch_size`; inside a batch at most
    /// `concurrency` files are in flight. A batch starts only once the
    /// previous one has fully resolved. A failing file does not stop its
    /// siblings, but the first batch with failures ends the sync.
    pub async fn sync(
        &self,
        instance_dir: &Path,
        files: &[ManifestFile],
        cancel: &CancellationToken,
    ) -> LauncherResult<SyncReport> {
        // Resolve every destination first so a bad path fails before any write.
        let mut planned: Vec<(&ManifestFile, PathBuf)> = Vec::with_capacity(files.len());
        let mut skipped = 0usize;
        for file in files {
            if !file.side.wanted_on_client() {
                skipped += 1;
                continue;
            }
            planned.push((file, file.local_path(instance_dir)?));
        }

        let total = planned.len();
        info!("Syncing {} files into {:?}", total, instance_dir);
        self.events.log(format!("Syncing {} mods/configs...", total));
        self.events
            .progress(SYNC_TASK, "Checking local files...", PERCENT_START as u8);

        let started = AtomicUsize::new(0);
        let processed = AtomicUsize::new(0);
        let mut report = SyncReport {
            total,
            skipped,
            ..SyncReport::default()
        };

        for batch in planned.chunks(self.options.batch_size.max(1)) {
            if cancel.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }

            let results: Vec<LauncherResult<FileOutcome>> = stream::iter(batch.iter())
                .map(|(file, dest)| {
                    let (started, processed) = (&started, &processed);
                    async move {
                        let ticket = started.fetch_add(1, Ordering::SeqCst);
                        self.report_checking(file, ticket, processed.load(Ordering::SeqCst), total);
                        let outcome = tokio::select! {
                            _ = cancel.cancelled() => Err(LauncherError::Cancelled),
                            r = self.sync_one(file, dest) => r,
                        };
                        processed.fetch_add(1, Ordering::SeqCst);
                        outcome
                    }
                })
                .buffer_unordered(self.options.concurrency.max(1))
                .collect()
                .await;

            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(FileOutcome::Verified) => report.verified += 1,
                    Ok(FileOutcome::Downloaded) => report.downloaded += 1,
                    Err(LauncherError::Cancelled) => return Err(LauncherError::Cancelled),
                    Err(e) => failures.push(e),
                }
            }

            if !failures.is_empty() {
                let failed = failures.len();
                let first = failures.swap_remove(0);
                return Err(LauncherError::SyncFailed {
                    failed,
                    total,
                    first: Box::new(first),
                });
            }
        }

        debug!(
            "Sync done: {} verified, {} downloaded, {} skipped",
            report.verified, report.downloaded, report.skipped
        );
        Ok(report)
    }

    /// `ticket` is unique per file, so one event is emitted per
    /// `progress_every` files whatever the concurrency.
    fn report_checking(&self, file: &ManifestFile, ticket: usize, done: usize, total: usize) {
        let every = self.options.progress_every.max(1);
        if ticket % every == 0 {
            self.events.progress(
                SYNC_TASK,
                format!("Checking {}...", file.filename),
                sync_percent(done, total),
            );
        }
    }

    async fn sync_one(&self, file: &ManifestFile, dest: &Path) -> LauncherResult<FileOutcome> {
        if verify::verify(dest, &file.hash).await? {
            return Ok(FileOutcome::Verified);
        }

        self.events.log(format!("Downloading: {}", file.filename));
        self.retry
            .run(&file.filename, || self.download_verified(file, dest))
            .await?;
        Ok(FileOutcome::Downloaded)
    }

    /// One transfer followed by a hash check; a mismatch removes the file and
    /// counts as a failed attempt.
    async fn download_verified(&self, file: &ManifestFile, dest: &Path) -> LauncherResult<()> {
        self.fetcher.fetch(&file.url, dest).await?;
        if verify::verify(dest, &file.hash).await? {
            return Ok(());
        }
        let actual = verify::hash_file(dest, HashAlgorithm::Sha256)
            .await
            .unwrap_or_default();
        if let Err(e) = tokio::fs::remove_file(dest).await {
            debug!("Cannot remove corrupt file {:?}: {}", dest, e);
        }
        Err(LauncherError::IntegrityMismatch {
            path: dest.to_path_buf(),
            expected: file.hash.clone(),
            actual,
        })
    }
}

/// `10 + floor(done / total * 40)`
pub fn sync_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return (PERCENT_START + PERCENT_SPAN) as u8;
    }
    (PERCENT_START + done.min(total) * PERCENT_SPAN / total) as u8
}
