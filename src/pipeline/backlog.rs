//! Backlog scanner: stateless coverage reporting over the content catalog.
//!
//! Every scan re-reads the catalog and the voice cache and classifies each
//! item by how many of the required voices have ready narration. Nothing is
//! memoized between scans; the persisted cache records are the only source
//! of truth, so a scan after a crash or a manual cache edit is always
//! accurate.

use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::cache::VoiceCacheStore;
use crate::core::catalog::{CatalogError, ContentCatalog};
use crate::core::voice::VoiceId;
use crate::pipeline::worker::{SynthesisWorker, WorkerError, WorkerOutcome};

// =============================================================================
// Coverage Types
// =============================================================================

/// How much of the required narration exists for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum NarrationCoverage {
    /// Every required voice has a ready entry
    Full,
    /// At least one required voice is ready, at least one is not
    Partial,
    /// No required voice is ready
    Missing,
}

impl NarrationCoverage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrationCoverage::Full => "full",
            NarrationCoverage::Partial => "partial",
            NarrationCoverage::Missing => "missing",
        }
    }

    pub fn needs_work(&self) -> bool {
        !matches!(self, NarrationCoverage::Full)
    }
}

/// Coverage of a single catalog item
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BacklogItem {
    pub content_id: String,
    pub title: String,
    pub coverage: NarrationCoverage,
    /// Required voices with a ready cache entry
    pub ready_voices: Vec<String>,
    /// Required voices still lacking one
    pub missing_voices: Vec<String>,
}

/// Read-only aggregate over one scan
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BacklogStatus {
    pub total_items: usize,
    pub full: usize,
    pub partial: usize,
    pub missing: usize,
    pub required_voices: Vec<String>,
    pub items: Vec<BacklogItem>,
}

/// A synthesis job handed to the runtime by [`BacklogScanner::run_one`]
#[derive(Debug)]
pub struct DispatchedJob {
    pub job_id: Uuid,
    pub content_id: String,
    /// Handle for the spawned worker run; callers may drop it
    pub handle: JoinHandle<Result<WorkerOutcome, WorkerError>>,
}

/// What one `run_one` call did
#[derive(Debug)]
pub struct BacklogRunReport {
    /// The single job dispatched, if any item needed work
    pub dispatched: Option<DispatchedJob>,
    /// Items that needed work at scan time, the dispatched one included
    pub remaining: usize,
}

// =============================================================================
// Backlog Scanner
// =============================================================================

/// Stateless scanner pairing the content catalog with the voice cache
pub struct BacklogScanner {
    catalog: Arc<dyn ContentCatalog>,
    cache: Arc<VoiceCacheStore>,
    worker: Arc<SynthesisWorker>,
    required_voices: Vec<VoiceId>,
}

impl BacklogScanner {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        cache: Arc<VoiceCacheStore>,
        worker: Arc<SynthesisWorker>,
        required_voices: Vec<VoiceId>,
    ) -> Self {
        Self {
            catalog,
            cache,
            worker,
            required_voices,
        }
    }

    /// Classify every catalog item.
    ///
    /// A catalog listing failure is fatal and is not retried here; the next
    /// scan starts from scratch anyway. A cache read failure for a single
    /// item downgrades that item to `Missing` and is logged, so one corrupt
    /// record cannot hide the rest of the backlog.
    pub async fn scan(&self) -> Result<Vec<BacklogItem>, CatalogError> {
        let items = self.catalog.list().await?;
        let mut classified = Vec::with_capacity(items.len());

        for item in items {
            let record = match self.cache.load(&item.content_id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Reading narration record for {} failed, treating as missing: {e}",
                        item.content_id
                    );
                    classified.push(BacklogItem {
                        content_id: item.content_id,
                        title: item.title,
                        coverage: NarrationCoverage::Missing,
                        ready_voices: Vec::new(),
                        missing_voices: self
                            .required_voices
                            .iter()
                            .map(|v| v.as_str().to_string())
                            .collect(),
                    });
                    continue;
                }
            };

            let ready: Vec<String> = self
                .required_voices
                .iter()
                .filter(|v| record.is_voice_ready(v))
                .map(|v| v.as_str().to_string())
                .collect();
            let missing: Vec<String> = record
                .missing_voices(&self.required_voices)
                .iter()
                .map(|v| v.as_str().to_string())
                .collect();

            let coverage = if missing.is_empty() {
                NarrationCoverage::Full
            } else if ready.is_empty() {
                NarrationCoverage::Missing
            } else {
                NarrationCoverage::Partial
            };

            classified.push(BacklogItem {
                content_id: item.content_id,
                title: item.title,
                coverage,
                ready_voices: ready,
                missing_voices: missing,
            });
        }

        Ok(classified)
    }

    /// Aggregate the current scan into a status report. Read-only.
    pub async fn status(&self) -> Result<BacklogStatus, CatalogError> {
        let items = self.scan().await?;
        let full = items
            .iter()
            .filter(|i| i.coverage == NarrationCoverage::Full)
            .count();
        let partial = items
            .iter()
            .filter(|i| i.coverage == NarrationCoverage::Partial)
            .count();
        let missing = items
            .iter()
            .filter(|i| i.coverage == NarrationCoverage::Missing)
            .count();

        Ok(BacklogStatus {
            total_items: items.len(),
            full,
            partial,
            missing,
            required_voices: self
                .required_voices
                .iter()
                .map(|v| v.as_str().to_string())
                .collect(),
            items,
        })
    }

    /// Dispatch a synthesis job for the first item that needs work.
    ///
    /// At most one job is spawned per call; the report carries the count of
    /// items the scan found unsatisfied, including the one just dispatched.
    /// The count reaches zero only once the backlog is drained. Callers
    /// drive it down by calling this repeatedly.
    pub async fn run_one(&self) -> Result<BacklogRunReport, CatalogError> {
        let scan = self.scan().await?;
        let mut pending = scan
            .into_iter()
            .filter(|i| i.coverage.needs_work())
            .collect::<Vec<_>>();
        let remaining = pending.len();

        if pending.is_empty() {
            debug!("Backlog scan found no items needing narration");
            return Ok(BacklogRunReport {
                dispatched: None,
                remaining: 0,
            });
        }
        let next = pending.remove(0);

        let item = self.catalog.get(&next.content_id).await?;
        let job_id = Uuid::new_v4();
        info!(
            "Dispatching narration job {job_id} for {} ({} items in backlog)",
            item.content_id, remaining
        );

        let worker = Arc::clone(&self.worker);
        let handle = tokio::spawn(async move { worker.run(&item).await });

        Ok(BacklogRunReport {
            dispatched: Some(DispatchedJob {
                job_id,
                content_id: next.content_id,
                handle,
            }),
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{ContentItem, MemoryCatalog};
    use crate::core::synthesis::{AudioPayload, SynthesisClient, SynthesisError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingClient {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SynthesisClient for CountingClient {
        fn provider_name(&self) -> &'static str {
            "counting"
        }

        async fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceId,
        ) -> Result<AudioPayload, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut data = vec![0xFF, 0xFB];
            data.resize(4096, 0x22);
            Ok(AudioPayload::sniffed(Bytes::from(data)))
        }
    }

    fn voice(id: &str) -> VoiceId {
        VoiceId::new(id).unwrap()
    }

    fn catalog_with(ids: &[&str]) -> Arc<MemoryCatalog> {
        let catalog = MemoryCatalog::new();
        for id in ids {
            catalog.insert(ContentItem {
                content_id: id.to_string(),
                title: format!("Title for {id}"),
                summary_text: "A summary worth narrating.".to_string(),
            });
        }
        Arc::new(catalog)
    }

    fn scanner(
        catalog: Arc<MemoryCatalog>,
        cache: Arc<VoiceCacheStore>,
    ) -> (BacklogScanner, Arc<CountingClient>) {
        let client = Arc::new(CountingClient {
            calls: AtomicU32::new(0),
        });
        let voices = vec![voice("alloy"), voice("nova")];
        let worker = Arc::new(SynthesisWorker::new(
            client.clone(),
            cache.clone(),
            voices.clone(),
            crate::pipeline::worker::WorkerSettings {
                voice_cooldown_ms: 0,
                ..Default::default()
            },
        ));
        (BacklogScanner::new(catalog, cache, worker, voices), client)
    }

    async fn fill_voice(cache: &VoiceCacheStore, content_id: &str, v: &str) {
        let mut data = vec![0xFF, 0xFB];
        data.resize(4096, 0x33);
        let payload = AudioPayload::sniffed(Bytes::from(data));
        cache
            .store_payloads(content_id, &voice(v), &[payload])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scan_classifies_coverage() {
        let catalog = catalog_with(&["book-a", "book-b", "book-c"]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        fill_voice(&cache, "book-a", "alloy").await;
        fill_voice(&cache, "book-a", "nova").await;
        fill_voice(&cache, "book-b", "alloy").await;

        let (scanner, _) = scanner(catalog, cache);
        let items = scanner.scan().await.unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].coverage, NarrationCoverage::Full);
        assert_eq!(items[1].coverage, NarrationCoverage::Partial);
        assert_eq!(items[1].missing_voices, vec!["nova"]);
        assert_eq!(items[2].coverage, NarrationCoverage::Missing);
    }

    #[tokio::test]
    async fn test_status_aggregates_without_mutating() {
        let catalog = catalog_with(&["book-a", "book-b"]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        fill_voice(&cache, "book-a", "alloy").await;

        let (scanner, client) = scanner(catalog, cache);
        let status = scanner.status().await.unwrap();

        assert_eq!(status.total_items, 2);
        assert_eq!(status.full, 0);
        assert_eq!(status.partial, 1);
        assert_eq!(status.missing, 1);
        // Status is read-only
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_one_dispatches_single_job() {
        let catalog = catalog_with(&["book-a", "book-b", "book-c"]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let (scanner, client) = scanner(catalog, cache.clone());

        let report = scanner.run_one().await.unwrap();
        let job = report.dispatched.expect("a job should be dispatched");
        assert_eq!(job.content_id, "book-a");
        // All three items need work; the count includes the dispatched one
        assert_eq!(report.remaining, 3);

        let outcome = job.handle.await.unwrap().unwrap();
        assert!(outcome.is_complete());
        // Two required voices, one segment each
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(cache.load("book-a").await.unwrap().is_voice_ready(&voice("alloy")));
    }

    #[tokio::test]
    async fn test_run_one_drains_backlog() {
        let catalog = catalog_with(&["book-a", "book-b"]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let (scanner, _) = scanner(catalog, cache);

        let first = scanner.run_one().await.unwrap();
        first.dispatched.unwrap().handle.await.unwrap().unwrap();

        let second = scanner.run_one().await.unwrap();
        let job = second.dispatched.expect("second item should dispatch");
        assert_eq!(job.content_id, "book-b");
        assert_eq!(second.remaining, 1);
        job.handle.await.unwrap().unwrap();

        let drained = scanner.run_one().await.unwrap();
        assert!(drained.dispatched.is_none());
        assert_eq!(drained.remaining, 0);
    }

    #[tokio::test]
    async fn test_run_one_counts_dispatched_item_as_remaining() {
        let catalog = catalog_with(&["book-solo"]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let (scanner, _) = scanner(catalog, cache);

        // One unsatisfied item: it is dispatched and still counted
        let report = scanner.run_one().await.unwrap();
        let job = report.dispatched.expect("the lone item should dispatch");
        assert_eq!(job.content_id, "book-solo");
        assert_eq!(report.remaining, 1);
        job.handle.await.unwrap().unwrap();

        let after = scanner.run_one().await.unwrap();
        assert!(after.dispatched.is_none());
        assert_eq!(after.remaining, 0);
    }

    #[tokio::test]
    async fn test_empty_catalog_scans_clean() {
        let catalog = catalog_with(&[]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let (scanner, _) = scanner(catalog, cache);

        let status = scanner.status().await.unwrap();
        assert_eq!(status.total_items, 0);
        let report = scanner.run_one().await.unwrap();
        assert!(report.dispatched.is_none());
    }
}
