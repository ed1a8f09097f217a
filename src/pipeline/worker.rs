//! Synthesis worker: fills the voice cache for one content item.
//!
//! A run loads the cache record, determines which required voices lack a
//! ready entry, and synthesizes them one at a time. Voices are strictly
//! sequential; providers rate-limit per account and parallel synthesis only
//! multiplies 429s.
//!
//! Retry policy per request:
//! - `RateLimited`: sleep the provider-supplied seconds (clamped), retry
//! - transient errors: exponential backoff, retry
//! - permanent errors: fail the voice immediately
//!
//! Retries share one bounded attempt budget. Each successful voice is
//! merged into the persisted record immediately, against a fresh read, so
//! progress survives a crash mid-run and concurrent merges cannot drop
//! entries.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::cache::{CacheError, VoiceCacheStore};
use crate::core::catalog::ContentItem;
use crate::core::synthesis::{AudioPayload, SynthesisClient, SynthesisError};
use crate::core::voice::VoiceId;
use crate::utils::text::{DEFAULT_MAX_SEGMENT_CHARS, prepare_for_synthesis};

// =============================================================================
// Constants
// =============================================================================

/// Attempt budget per synthesis request. Rate-limited and transient retries
/// both consume attempts.
pub const MAX_SYNTHESIS_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff on transient errors (milliseconds).
pub const BASE_RETRY_DELAY_MS: u64 = 500;

/// Upper bound honored for a provider-mandated Retry-After sleep (seconds).
pub const MAX_RETRY_AFTER_SECS: u64 = 30;

/// Cooldown between consecutive voices (milliseconds).
pub const DEFAULT_VOICE_COOLDOWN_MS: u64 = 1_000;

// =============================================================================
// Settings and Outcome
// =============================================================================

/// Tuning knobs for a worker run
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Attempt budget per synthesis request
    pub max_attempts: u32,
    /// Base backoff delay for transient errors (ms)
    pub base_retry_delay_ms: u64,
    /// Clamp for provider Retry-After sleeps (seconds)
    pub max_retry_after_secs: u64,
    /// Sleep between voices (ms)
    pub voice_cooldown_ms: u64,
    /// Per-request character cap for text segmentation
    pub max_segment_chars: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SYNTHESIS_ATTEMPTS,
            base_retry_delay_ms: BASE_RETRY_DELAY_MS,
            max_retry_after_secs: MAX_RETRY_AFTER_SECS,
            voice_cooldown_ms: DEFAULT_VOICE_COOLDOWN_MS,
            max_segment_chars: DEFAULT_MAX_SEGMENT_CHARS,
        }
    }
}

/// Result of one worker run, reported distinctly per class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Every required voice has a ready cache entry
    Complete { ready: Vec<VoiceId> },
    /// Some required voices are ready, some are not
    Partial {
        ready: Vec<VoiceId>,
        failed: Vec<VoiceId>,
    },
    /// No required voice is ready
    Failed { failed: Vec<VoiceId> },
}

impl WorkerOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, WorkerOutcome::Complete { .. })
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, WorkerOutcome::Partial { .. })
    }
}

/// Errors that abort a worker run outright
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Voice cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

// =============================================================================
// Synthesis Worker
// =============================================================================

/// Sequential per-voice narration generator
pub struct SynthesisWorker {
    client: Arc<dyn SynthesisClient>,
    cache: Arc<VoiceCacheStore>,
    required_voices: Vec<VoiceId>,
    settings: WorkerSettings,
}

impl SynthesisWorker {
    pub fn new(
        client: Arc<dyn SynthesisClient>,
        cache: Arc<VoiceCacheStore>,
        required_voices: Vec<VoiceId>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            client,
            cache,
            required_voices,
            settings,
        }
    }

    /// Generate narration for every required voice the cache lacks.
    ///
    /// Re-entrant: a run over a fully-cached item makes no synthesis calls
    /// and reports `Complete`.
    pub async fn run(&self, item: &ContentItem) -> Result<WorkerOutcome, WorkerError> {
        let record = self.cache.load(&item.content_id).await?;
        let missing = record.missing_voices(&self.required_voices);
        let mut ready: Vec<VoiceId> = self
            .required_voices
            .iter()
            .filter(|v| record.is_voice_ready(v))
            .cloned()
            .collect();

        if missing.is_empty() {
            info!(
                "Narration for {} already complete ({} voices)",
                item.content_id,
                ready.len()
            );
            return Ok(WorkerOutcome::Complete { ready });
        }

        info!(
            "Generating narration for {} ({} of {} voices missing)",
            item.content_id,
            missing.len(),
            self.required_voices.len()
        );

        let mut failed: Vec<VoiceId> = Vec::new();
        for (index, voice) in missing.iter().enumerate() {
            if index > 0 && self.settings.voice_cooldown_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.voice_cooldown_ms)).await;
            }

            match self.synthesize_voice(item, voice).await {
                Ok(payloads) => {
                    match self
                        .cache
                        .store_payloads(&item.content_id, voice, &payloads)
                        .await
                    {
                        Ok(merged) if merged.is_voice_ready(voice) => {
                            debug!("Voice {voice} for {} persisted ready", item.content_id);
                            ready.push(voice.clone());
                        }
                        Ok(_) => {
                            warn!(
                                "Voice {voice} for {} persisted below the ready floor",
                                item.content_id
                            );
                            failed.push(voice.clone());
                        }
                        Err(e) => {
                            tracing::error!(
                                "Persisting voice {voice} for {} failed: {e}",
                                item.content_id
                            );
                            failed.push(voice.clone());
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Voice {voice} for {} failed permanently this run: {e}",
                        item.content_id
                    );
                    failed.push(voice.clone());
                }
            }
        }

        let outcome = if failed.is_empty() {
            WorkerOutcome::Complete { ready }
        } else if ready.is_empty() {
            WorkerOutcome::Failed { failed }
        } else {
            WorkerOutcome::Partial { ready, failed }
        };

        match &outcome {
            WorkerOutcome::Complete { ready } => {
                info!(
                    "Narration for {} complete ({} voices ready)",
                    item.content_id,
                    ready.len()
                );
            }
            WorkerOutcome::Partial { ready, failed } => {
                warn!(
                    "Narration for {} partial ({} ready, {} failed)",
                    item.content_id,
                    ready.len(),
                    failed.len()
                );
            }
            WorkerOutcome::Failed { failed } => {
                tracing::error!(
                    "Narration for {} failed for all {} attempted voices",
                    item.content_id,
                    failed.len()
                );
            }
        }
        Ok(outcome)
    }

    /// Synthesize every text segment for one voice, in order.
    ///
    /// A segment that exhausts its attempt budget fails the whole voice;
    /// partial voices are never persisted.
    async fn synthesize_voice(
        &self,
        item: &ContentItem,
        voice: &VoiceId,
    ) -> Result<Vec<AudioPayload>, SynthesisError> {
        let segments = prepare_for_synthesis(&item.summary_text, self.settings.max_segment_chars);
        if segments.is_empty() {
            return Err(SynthesisError::InvalidInput(format!(
                "Content {} has no synthesizable text",
                item.content_id
            )));
        }

        let mut payloads = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            debug!(
                "Synthesizing segment {}/{} of {} (voice: {voice})",
                index + 1,
                segments.len(),
                item.content_id
            );
            payloads.push(self.synthesize_with_retry(segment, voice).await?);
        }
        Ok(payloads)
    }

    /// One synthesis request with the bounded retry loop.
    async fn synthesize_with_retry(
        &self,
        text: &str,
        voice: &VoiceId,
    ) -> Result<AudioPayload, SynthesisError> {
        let mut retry_after_secs: Option<u64> = None;
        let mut last_error: Option<SynthesisError> = None;

        for attempt in 0..self.settings.max_attempts {
            if attempt > 0 {
                // Honor Retry-After exactly when the provider sent one,
                // otherwise exponential backoff
                let delay_ms = match retry_after_secs.take() {
                    Some(secs) => secs.min(self.settings.max_retry_after_secs) * 1_000,
                    None => self.settings.base_retry_delay_ms * 2u64.pow(attempt - 1),
                };
                debug!(
                    "Retry attempt {} for voice {voice} after {delay_ms}ms",
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.client.synthesize(text, voice).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_retryable() && attempt < self.settings.max_attempts - 1 => {
                    warn!("Retryable synthesis error on attempt {} for voice {voice}: {e}", attempt + 1);
                    retry_after_secs = e.retry_after_secs();
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SynthesisError::Provider {
                status: 0,
                message: "Synthesis attempts exhausted".to_string(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Per-voice scripted behavior for the mock client
    #[derive(Clone)]
    enum Behavior {
        Ok { payload_len: usize },
        AlwaysRateLimited { retry_after_secs: u64 },
        AlwaysTransient,
        Permanent,
        TransientThenOk { failures: u32, payload_len: usize },
    }

    struct ScriptedClient {
        behaviors: HashMap<String, Behavior>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedClient {
        fn new(behaviors: Vec<(&str, Behavior)>) -> Arc<Self> {
            Arc::new(Self {
                behaviors: behaviors
                    .into_iter()
                    .map(|(v, b)| (v.to_string(), b))
                    .collect(),
                calls: Mutex::new(HashMap::new()),
            })
        }

        fn calls_for(&self, voice: &str) -> u32 {
            self.calls.lock().get(voice).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> u32 {
            self.calls.lock().values().sum()
        }

        fn mp3_payload(len: usize) -> AudioPayload {
            let mut data = vec![0xFF, 0xFB];
            data.resize(len, 0x11);
            AudioPayload::sniffed(Bytes::from(data))
        }
    }

    #[async_trait]
    impl SynthesisClient for ScriptedClient {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        async fn synthesize(
            &self,
            _text: &str,
            voice: &VoiceId,
        ) -> Result<AudioPayload, SynthesisError> {
            let call_number = {
                let mut calls = self.calls.lock();
                let counter = calls.entry(voice.as_str().to_string()).or_insert(0);
                *counter += 1;
                *counter
            };

            match self.behaviors.get(voice.as_str()) {
                Some(Behavior::Ok { payload_len }) => Ok(Self::mp3_payload(*payload_len)),
                Some(Behavior::AlwaysRateLimited { retry_after_secs }) => {
                    Err(SynthesisError::RateLimited {
                        retry_after_secs: *retry_after_secs,
                    })
                }
                Some(Behavior::AlwaysTransient) => Err(SynthesisError::Provider {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                }),
                Some(Behavior::Permanent) => {
                    Err(SynthesisError::InvalidVoice("unknown voice".to_string()))
                }
                Some(Behavior::TransientThenOk {
                    failures,
                    payload_len,
                }) => {
                    if call_number <= *failures {
                        Err(SynthesisError::Timeout("deadline elapsed".to_string()))
                    } else {
                        Ok(Self::mp3_payload(*payload_len))
                    }
                }
                None => Err(SynthesisError::InvalidVoice(format!(
                    "no behavior for {voice}"
                ))),
            }
        }
    }

    fn voice(id: &str) -> VoiceId {
        VoiceId::new(id).unwrap()
    }

    fn item() -> ContentItem {
        ContentItem {
            content_id: "book-1".to_string(),
            title: "A Short Book".to_string(),
            summary_text: "One short summary sentence.".to_string(),
        }
    }

    fn worker(client: Arc<ScriptedClient>, cache: Arc<VoiceCacheStore>) -> SynthesisWorker {
        SynthesisWorker::new(
            client,
            cache,
            vec![voice("alloy"), voice("nova"), voice("echo")],
            WorkerSettings::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_voices_generated() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 4096 }),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let outcome = worker(client.clone(), cache.clone())
            .run(&item())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(client.total_calls(), 3);

        let record = cache.load("book-1").await.unwrap();
        assert_eq!(record.ready_voice_count(&[voice("alloy"), voice("nova"), voice("echo")]), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_rerun_makes_no_calls() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 4096 }),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let w = worker(client.clone(), cache.clone());

        w.run(&item()).await.unwrap();
        assert_eq!(client.total_calls(), 3);

        let outcome = w.run(&item()).await.unwrap();
        assert!(outcome.is_complete());
        // Second run found everything ready and made zero synthesis calls
        assert_eq!(client.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_voice_exhausts_attempt_budget() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 4096 }),
            ("nova", Behavior::AlwaysRateLimited { retry_after_secs: 1 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let outcome = worker(client.clone(), cache.clone())
            .run(&item())
            .await
            .unwrap();

        // Exactly the attempt budget, no more
        assert_eq!(client.calls_for("nova"), MAX_SYNTHESIS_ATTEMPTS);
        assert_eq!(client.calls_for("alloy"), 1);
        assert_eq!(client.calls_for("echo"), 1);

        match outcome {
            WorkerOutcome::Partial { ready, failed } => {
                assert_eq!(failed, vec![voice("nova")]);
                assert_eq!(ready.len(), 2);
            }
            other => panic!("Expected Partial, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_sleep_honors_header() {
        let client = ScriptedClient::new(vec![(
            "alloy",
            Behavior::AlwaysRateLimited { retry_after_secs: 7 },
        )]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let w = SynthesisWorker::new(
            client,
            cache,
            vec![voice("alloy")],
            WorkerSettings::default(),
        );

        let started = tokio::time::Instant::now();
        let outcome = w.run(&item()).await.unwrap();
        let elapsed = started.elapsed();

        // Two retries, each sleeping the mandated 7 seconds
        assert!(elapsed >= Duration::from_secs(14), "slept only {elapsed:?}");
        assert!(matches!(outcome, WorkerOutcome::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_clamped_to_cap() {
        let client = ScriptedClient::new(vec![(
            "alloy",
            Behavior::AlwaysRateLimited {
                retry_after_secs: 9_999,
            },
        )]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let settings = WorkerSettings {
            max_retry_after_secs: 5,
            ..Default::default()
        };
        let w = SynthesisWorker::new(client, cache, vec![voice("alloy")], settings);

        let started = tokio::time::Instant::now();
        w.run(&item()).await.unwrap();
        let elapsed = started.elapsed();

        // Two retries at the 5s clamp, not the mandated 9999s
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_no_retry() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Permanent),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let outcome = worker(client.clone(), cache.clone())
            .run(&item())
            .await
            .unwrap();

        assert_eq!(client.calls_for("alloy"), 1);
        assert!(outcome.is_partial());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_recovers_with_backoff() {
        let client = ScriptedClient::new(vec![
            (
                "alloy",
                Behavior::TransientThenOk {
                    failures: 2,
                    payload_len: 4096,
                },
            ),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let outcome = worker(client.clone(), cache.clone())
            .run(&item())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(client.calls_for("alloy"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_voices_fail() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Permanent),
            ("nova", Behavior::Permanent),
            ("echo", Behavior::AlwaysTransient),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let outcome = worker(client, cache).run(&item()).await.unwrap();

        match outcome {
            WorkerOutcome::Failed { failed } => assert_eq!(failed.len(), 3),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_voice_does_not_block_remaining() {
        // Processing order is required-voice order; the first fails, the
        // rest still get generated and persisted
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::AlwaysTransient),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        worker(client, cache.clone()).run(&item()).await.unwrap();

        let record = cache.load("book-1").await.unwrap();
        assert!(!record.is_voice_ready(&voice("alloy")));
        assert!(record.is_voice_ready(&voice("nova")));
        assert!(record.is_voice_ready(&voice("echo")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_resume_fills_only_missing() {
        let cache = Arc::new(VoiceCacheStore::in_memory());

        // First run: nova fails
        let failing = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 4096 }),
            ("nova", Behavior::Permanent),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let outcome = worker(failing, cache.clone()).run(&item()).await.unwrap();
        assert!(outcome.is_partial());

        // Second run with a healthy provider only touches nova
        let healthy = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 4096 }),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let outcome = worker(healthy.clone(), cache.clone())
            .run(&item())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(healthy.calls_for("nova"), 1);
        assert_eq!(healthy.calls_for("alloy"), 0);
        assert_eq!(healthy.calls_for("echo"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_between_voices() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 4096 }),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let settings = WorkerSettings {
            voice_cooldown_ms: 2_000,
            ..Default::default()
        };
        let w = SynthesisWorker::new(
            client,
            cache,
            vec![voice("alloy"), voice("nova"), voice("echo")],
            settings,
        );

        let started = tokio::time::Instant::now();
        w.run(&item()).await.unwrap();

        // Two gaps between three voices
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_floor_payload_counts_as_failed() {
        let client = ScriptedClient::new(vec![
            ("alloy", Behavior::Ok { payload_len: 64 }),
            ("nova", Behavior::Ok { payload_len: 4096 }),
            ("echo", Behavior::Ok { payload_len: 4096 }),
        ]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let outcome = worker(client, cache.clone()).run(&item()).await.unwrap();

        match outcome {
            WorkerOutcome::Partial { failed, .. } => {
                assert_eq!(failed, vec![voice("alloy")]);
            }
            other => panic!("Expected Partial, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_summary_fails_voice_without_calls() {
        let client = ScriptedClient::new(vec![("alloy", Behavior::Ok { payload_len: 4096 })]);
        let cache = Arc::new(VoiceCacheStore::in_memory());
        let w = SynthesisWorker::new(
            client.clone(),
            cache,
            vec![voice("alloy")],
            WorkerSettings::default(),
        );

        let empty_item = ContentItem {
            content_id: "book-2".to_string(),
            title: "Empty".to_string(),
            summary_text: "   ".to_string(),
        };
        let outcome = w.run(&empty_item).await.unwrap();

        assert!(matches!(outcome, WorkerOutcome::Failed { .. }));
        assert_eq!(client.total_calls(), 0);
    }
}
