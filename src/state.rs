//! Shared application state.
//!
//! One [`AppState`] is built at startup and handed to every handler behind
//! an `Arc`. It owns the synthesis client, the content catalog, the voice
//! cache, the backlog scanner, the progress store, and a short-TTL response
//! cache for chunk lookups.

use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::ServerConfig;
use crate::core::cache::{VoiceCacheStore, VoiceEntry, build_store};
use crate::core::catalog::{ContentCatalog, MemoryCatalog};
use crate::core::synthesis::{SynthesisClient, create_synthesis_client};
use crate::core::voice::VoiceId;
use crate::errors::AppError;
use crate::pipeline::backlog::BacklogScanner;
use crate::pipeline::worker::SynthesisWorker;
use crate::playback::{MemoryProgressStore, ProgressStore};

/// Capacity of the chunk response cache (entries)
const CHUNK_CACHE_CAPACITY: u64 = 1_000;

/// Shared state for all request handlers
pub struct AppState {
    /// Loaded service configuration
    pub config: ServerConfig,
    /// Content items eligible for narration
    pub catalog: Arc<MemoryCatalog>,
    /// Durable per-content voice cache
    pub cache: Arc<VoiceCacheStore>,
    /// Listening progress, keyed by user and content
    pub progress: Arc<dyn ProgressStore>,
    /// Synthesis provider client
    pub client: Arc<dyn SynthesisClient>,
    /// Worker configured with the full required voice set
    pub worker: Arc<SynthesisWorker>,
    /// Stateless backlog scanner
    pub scanner: Arc<BacklogScanner>,
    /// Validated required voices, in configured order
    pub required_voices: Vec<VoiceId>,
    /// Short-TTL cache over ready voice entries, keyed by
    /// `(content_id, voice_id)`
    chunk_cache: Cache<(String, String), Arc<VoiceEntry>>,
    started_at: Instant,
}

impl AppState {
    /// Wire up the service from its configuration.
    ///
    /// Fails when the provider client cannot be built (missing API key,
    /// bad base URL) or the cache store location is unusable.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, AppError> {
        let required_voices = config.required_voice_ids()?;

        let synthesis_config = config
            .synthesis_config()
            .map_err(AppError::Configuration)?;
        let client: Arc<dyn SynthesisClient> = Arc::from(create_synthesis_client(
            &config.synthesis_provider,
            synthesis_config,
        )?);
        info!(
            "Synthesis provider: {} ({} required voices)",
            client.provider_name(),
            required_voices.len()
        );

        let store = build_store(&config.store_location())?;
        let cache = Arc::new(VoiceCacheStore::new(
            store,
            config.cache_prefix.clone(),
            config.min_ready_bytes,
        ));

        let catalog = Arc::new(MemoryCatalog::new());
        let worker = Arc::new(SynthesisWorker::new(
            client.clone(),
            cache.clone(),
            required_voices.clone(),
            config.worker_settings(),
        ));
        let scanner = Arc::new(BacklogScanner::new(
            catalog.clone() as Arc<dyn ContentCatalog>,
            cache.clone(),
            worker.clone(),
            required_voices.clone(),
        ));

        let chunk_cache = Cache::builder()
            .max_capacity(CHUNK_CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(config.chunk_ttl_secs))
            .build();

        Ok(Arc::new(Self {
            config,
            catalog,
            cache,
            progress: Arc::new(MemoryProgressStore::new()),
            client,
            worker,
            scanner,
            required_voices,
            chunk_cache,
            started_at: Instant::now(),
        }))
    }

    /// Seconds since the state was built
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// A worker scoped to a single voice, for targeted generation requests
    pub fn worker_for_voice(&self, voice: VoiceId) -> SynthesisWorker {
        SynthesisWorker::new(
            self.client.clone(),
            self.cache.clone(),
            vec![voice],
            self.config.worker_settings(),
        )
    }

    /// Ready voice entry for `(content_id, voice)`, through the response
    /// cache.
    ///
    /// Only ready entries are cached; a miss always re-reads the store so
    /// freshly synthesized audio shows up without waiting out a TTL.
    pub async fn ready_entry(
        &self,
        content_id: &str,
        voice: &VoiceId,
    ) -> Result<Option<Arc<VoiceEntry>>, AppError> {
        let key = (content_id.to_string(), voice.as_str().to_string());
        if let Some(entry) = self.chunk_cache.get(&key).await {
            return Ok(Some(entry));
        }

        let record = self.cache.load(content_id).await?;
        match record.ready_entry(voice) {
            Some(entry) => {
                let entry = Arc::new(entry.clone());
                self.chunk_cache.insert(key, entry.clone()).await;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthesis::AudioPayload;
    use bytes::Bytes;

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.openai_api_key = Some("sk-test-key".to_string());
        config
    }

    fn voice(id: &str) -> VoiceId {
        VoiceId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_state_builds_from_config() {
        let state = AppState::new(test_config()).unwrap();
        assert_eq!(state.client.provider_name(), "openai");
        assert_eq!(state.required_voices.len(), 3);
        assert!(state.catalog.is_empty());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let Err(err) = AppState::new(ServerConfig::default()) else {
            panic!("state should not build without an API key");
        };
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_ready_entry_caches_only_ready_audio() {
        let state = AppState::new(test_config()).unwrap();

        // Nothing synthesized yet
        let entry = state.ready_entry("book-1", &voice("alloy")).await.unwrap();
        assert!(entry.is_none());

        let mut data = vec![0xFF, 0xFB];
        data.resize(4096, 0x11);
        state
            .cache
            .store_payloads("book-1", &voice("alloy"), &[AudioPayload::sniffed(
                Bytes::from(data),
            )])
            .await
            .unwrap();

        // The earlier miss was not negatively cached
        let entry = state
            .ready_entry("book-1", &voice("alloy"))
            .await
            .unwrap()
            .unwrap();
        assert!(entry.ready);
        assert_eq!(entry.byte_len, 4096);
    }

    #[tokio::test]
    async fn test_single_voice_worker_is_scoped() {
        let state = AppState::new(test_config()).unwrap();
        // Construction only; the scoped worker shares client and cache
        let _worker = state.worker_for_voice(voice("nova"));
    }
}
