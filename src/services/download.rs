//! Media download service.
//!
//! Resolves each discovered record's media candidates from its archived
//! embed page and streams the best candidate to disk. Emits events for
//! progress tracking; the CLI layer decides how to display them.
//!
//! Failure never aborts the batch: a record that cannot be resolved or whose
//! stream breaks is marked failed and the workers move on.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::archive::ArchiveLocator;
use crate::extract::extract_media_candidates;
use crate::http_client::Fetch;
use crate::models::{FailureReason, VideoRecord, VideoState};
use crate::utils::video_output_path;

/// Download stage configuration.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory receiving `{owner} - {title}.mp4` files.
    pub output_dir: PathBuf,
    /// Quality tags to prefer, best first.
    pub quality_preference: Vec<String>,
    /// Concurrent download workers. The shared rate limiter is the only
    /// network gate, and destination paths are unique per record, so workers
    /// never contend on a file.
    pub workers: usize,
}

/// Progress events emitted while the batch runs.
#[derive(Debug)]
pub enum DownloadEvent {
    Started {
        worker_id: usize,
        record_id: String,
        title: String,
    },
    /// Destination already existed with nonzero size; no network call made.
    AlreadyOnDisk { record_id: String },
    Completed { record_id: String },
    Failed {
        record_id: String,
        reason: FailureReason,
    },
}

/// Final counts for the batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// What happened to one processed record.
enum Outcome {
    Downloaded,
    AlreadyOnDisk,
    Failed,
}

/// Service downloading media for discovered records.
#[derive(Clone)]
pub struct DownloadService {
    fetcher: Arc<dyn Fetch>,
    locator: Arc<ArchiveLocator>,
    config: Arc<DownloadConfig>,
}

impl DownloadService {
    /// Create a download service over the given fetch seam.
    pub fn new(fetcher: Arc<dyn Fetch>, locator: ArchiveLocator, config: DownloadConfig) -> Self {
        Self {
            fetcher,
            locator: Arc::new(locator),
            config: Arc::new(config),
        }
    }

    /// Download media for every record still in the `Discovered` state.
    ///
    /// Records are claimed in discovery order and handed back in the same
    /// order with their final states. Returns the updated records and the
    /// batch summary.
    pub async fn run(
        &self,
        records: Vec<VideoRecord>,
        event_tx: mpsc::Sender<DownloadEvent>,
    ) -> std::io::Result<(Vec<VideoRecord>, DownloadSummary)> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let total = records.len();
        let queue: Arc<Mutex<VecDeque<(usize, VideoRecord)>>> =
            Arc::new(Mutex::new(records.into_iter().enumerate().collect()));
        let results: Arc<Mutex<Vec<Option<VideoRecord>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));

        let downloaded = Arc::new(AtomicUsize::new(0));
        let already_present = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let workers = self.config.workers.max(1);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let service = self.clone();
            let queue = queue.clone();
            let results = results.clone();
            let downloaded = downloaded.clone();
            let already_present = already_present.clone();
            let failed = failed.clone();
            let event_tx = event_tx.clone();

            let handle = tokio::spawn(async move {
                loop {
                    let claimed = queue.lock().await.pop_front();
                    let Some((index, mut record)) = claimed else {
                        break;
                    };

                    if record.state == VideoState::Discovered {
                        let outcome = service
                            .process_record(worker_id, &mut record, &event_tx)
                            .await;
                        match outcome {
                            Outcome::Downloaded => {
                                downloaded.fetch_add(1, Ordering::Relaxed);
                            }
                            Outcome::AlreadyOnDisk => {
                                already_present.fetch_add(1, Ordering::Relaxed);
                            }
                            Outcome::Failed => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }

                    results.lock().await[index] = Some(record);
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }

        let records: Vec<VideoRecord> = results.lock().await.drain(..).flatten().collect();

        let summary = DownloadSummary {
            downloaded: downloaded.load(Ordering::Relaxed),
            already_present: already_present.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        };

        Ok((records, summary))
    }

    /// Run one record through resolution and download, updating its state.
    async fn process_record(
        &self,
        worker_id: usize,
        record: &mut VideoRecord,
        event_tx: &mpsc::Sender<DownloadEvent>,
    ) -> Outcome {
        let _ = event_tx
            .send(DownloadEvent::Started {
                worker_id,
                record_id: record.id.clone(),
                title: record.title.clone(),
            })
            .await;

        let dest = video_output_path(&self.config.output_dir, &record.owner, &record.title);

        // Idempotence across runs: file presence + nonzero size is the
        // durable record of success.
        if let Ok(meta) = tokio::fs::metadata(&dest).await {
            if meta.len() > 0 {
                debug!("{} already on disk at {}", record.id, dest.display());
                record.mark_downloaded();
                let _ = event_tx
                    .send(DownloadEvent::AlreadyOnDisk {
                        record_id: record.id.clone(),
                    })
                    .await;
                return Outcome::AlreadyOnDisk;
            }
        }

        let embed_url = self.locator.embed_url(&record.id);
        let html = match self.fetcher.get_text(&embed_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("embed page fetch failed for {}: {}", record.id, e);
                self.fail(record, FailureReason::NoMedia, event_tx).await;
                return Outcome::Failed;
            }
        };

        let candidates = extract_media_candidates(&html, &self.config.quality_preference);
        if candidates.is_empty() {
            debug!("no media sources on embed page for {}", record.id);
            self.fail(record, FailureReason::NoMedia, event_tx).await;
            return Outcome::Failed;
        }
        record.mark_resolved(candidates);

        let media_url = record.media_candidates[0].url.clone();
        let mut response = match self.fetcher.get_media(&media_url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("media fetch failed for {}: {}", record.id, e);
                self.fail(record, FailureReason::DownloadError, event_tx)
                    .await;
                return Outcome::Failed;
            }
        };

        // Stream into a partial file, renamed into place only on success, so
        // an interrupted download never leaves a truncated destination.
        let part = dest.with_extension("mp4.part");
        let stream_result = async {
            let mut file = tokio::fs::File::create(&part).await?;
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => file.write_all(&chunk).await?,
                    Ok(None) => break,
                    Err(e) => {
                        return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
                    }
                }
            }
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        match stream_result {
            Ok(()) => {
                if let Err(e) = tokio::fs::rename(&part, &dest).await {
                    warn!("failed to move {} into place: {}", part.display(), e);
                    let _ = tokio::fs::remove_file(&part).await;
                    self.fail(record, FailureReason::DownloadError, event_tx)
                        .await;
                    return Outcome::Failed;
                }
                record.mark_downloaded();
                let _ = event_tx
                    .send(DownloadEvent::Completed {
                        record_id: record.id.clone(),
                    })
                    .await;
                Outcome::Downloaded
            }
            Err(e) => {
                warn!("stream for {} broke: {}", record.id, e);
                let _ = tokio::fs::remove_file(&part).await;
                self.fail(record, FailureReason::DownloadError, event_tx)
                    .await;
                Outcome::Failed
            }
        }
    }

    async fn fail(
        &self,
        record: &mut VideoRecord,
        reason: FailureReason,
        event_tx: &mpsc::Sender<DownloadEvent>,
    ) {
        record.mark_failed(reason);
        let _ = event_tx
            .send(DownloadEvent::Failed {
                record_id: record.id.clone(),
                reason,
            })
            .await;
    }
}
