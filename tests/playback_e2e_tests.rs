//! Full listen-path test: a playback request triggers generation over a
//! scripted HTTP provider, the readiness poller waits for the cache to
//! fill, and the engine plays the synthesized chunks through to completion.

mod fixtures;
mod mock_providers;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use narrata_audio::core::cache::VoiceCacheStore;
use narrata_audio::core::catalog::{ContentCatalog, ContentItem, MemoryCatalog};
use narrata_audio::core::synthesis::{SynthesisClient, SynthesisConfig, create_synthesis_client};
use narrata_audio::core::voice::VoiceId;
use narrata_audio::pipeline::worker::{SynthesisWorker, WorkerSettings};
use narrata_audio::playback::{
    AudioTransport, CacheChunkSource, ChunkEnd, EngineState, GenerationTrigger,
    MemoryProgressStore, PlaybackEngine, PlaybackError, PollerSettings, ProgressStore,
    ReadinessPoller, TriggerError,
};

use fixtures::mp3_bytes;
use mock_providers::MockSpeechServer;

fn voice(id: &str) -> VoiceId {
    VoiceId::new(id).unwrap()
}

/// Trigger that dispatches a real worker run for the catalog item
struct WorkerTrigger {
    catalog: Arc<MemoryCatalog>,
    worker: Arc<SynthesisWorker>,
}

#[async_trait]
impl GenerationTrigger for WorkerTrigger {
    async fn trigger(&self, content_id: &str, _voice: &VoiceId) -> Result<(), TriggerError> {
        let item = self
            .catalog
            .get(content_id)
            .await
            .map_err(|e| TriggerError(e.to_string()))?;
        let worker = Arc::clone(&self.worker);
        tokio::spawn(async move {
            let _ = worker.run(&item).await;
        });
        Ok(())
    }
}

/// Transport that records chunk bytes and finishes instantly
#[derive(Default)]
struct CollectingTransport {
    chunks: Mutex<Vec<Bytes>>,
}

#[async_trait]
impl AudioTransport for CollectingTransport {
    async fn play_chunk(&self, _index: usize, audio: Bytes) -> Result<ChunkEnd, PlaybackError> {
        self.chunks.lock().push(audio);
        Ok(ChunkEnd::Finished)
    }

    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {}
}

struct Harness {
    cache: Arc<VoiceCacheStore>,
    poller: ReadinessPoller,
}

fn harness(mock: &MockSpeechServer) -> Harness {
    let config = SynthesisConfig {
        api_key: "sk-test".to_string(),
        base_url: Some(mock.base_url()),
        ..Default::default()
    };
    let client: Arc<dyn SynthesisClient> =
        Arc::from(create_synthesis_client("openai", config).unwrap());
    let cache = Arc::new(VoiceCacheStore::in_memory());
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.insert(ContentItem {
        content_id: "book-1".to_string(),
        title: "A Short Book".to_string(),
        summary_text: "One short summary sentence.".to_string(),
    });

    let worker = Arc::new(SynthesisWorker::new(
        client,
        cache.clone(),
        vec![voice("alloy")],
        WorkerSettings {
            base_retry_delay_ms: 1,
            voice_cooldown_ms: 0,
            ..Default::default()
        },
    ));
    let trigger = Arc::new(WorkerTrigger {
        catalog: catalog.clone(),
        worker,
    });
    let poller = ReadinessPoller::new(
        Arc::new(CacheChunkSource::new(cache.clone())),
        trigger,
        PollerSettings {
            poll_interval: Duration::from_millis(10),
            budget: Duration::from_secs(5),
        },
    );

    Harness { cache, poller }
}

async fn wait_for_state(engine: &PlaybackEngine, wanted: EngineState) {
    for _ in 0..500 {
        if engine.state() == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Engine never reached {wanted:?}, stuck at {:?}", engine.state());
}

#[tokio::test]
async fn test_listen_path_generates_then_plays() {
    let mock = MockSpeechServer::start().await;
    let audio = mp3_bytes(2_048);
    mock.always_succeed(audio.clone()).await;

    let h = harness(&mock);

    // The poller fires generation and waits for the cache to fill
    let chunks = h
        .poller
        .wait_for_chunks("book-1", &voice("alloy"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);

    let transport = Arc::new(CollectingTransport::default());
    let progress = Arc::new(MemoryProgressStore::new());
    let engine = PlaybackEngine::new(
        transport.clone(),
        Arc::new(CacheChunkSource::new(h.cache.clone())),
        progress.clone(),
    );

    engine.play("user-1", "book-1", &voice("alloy")).await.unwrap();
    wait_for_state(&engine, EngineState::Completed).await;

    // The transport received exactly the synthesized bytes
    let played = transport.chunks.lock().clone();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].as_ref(), audio.as_slice());

    // Completion was persisted
    let record = progress.get("user-1", "book-1").await.unwrap().unwrap();
    assert_eq!(record.percentage, 100.0);
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn test_unknown_content_fails_wait_within_budget() {
    let mock = MockSpeechServer::start().await;
    let h = harness(&mock);

    // The trigger cannot dispatch for an unknown id; polling then runs out
    let err = h
        .poller
        .wait_for_chunks("no-such-book", &voice("alloy"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::GenerationNotReady { .. }));
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn test_provider_rejection_exhausts_poll_budget() {
    let mock = MockSpeechServer::start().await;
    mock.always_fail(400).await;
    let h = harness(&mock);

    let err = h
        .poller
        .wait_for_chunks("book-1", &voice("alloy"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::GenerationNotReady { .. }));
    // The permanent rejection was not retried by the worker
    assert_eq!(mock.request_count().await, 1);

    // Nothing below the ready floor leaked into the cache
    let record = h.cache.load("book-1").await.unwrap();
    assert!(!record.is_voice_ready(&voice("alloy")));
}

#[tokio::test]
async fn test_cancel_during_wait_returns_promptly() {
    let mock = MockSpeechServer::start().await;
    mock.always_fail(500).await;
    let h = harness(&mock);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let err = h
        .poller
        .wait_for_chunks("book-1", &voice("alloy"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::Cancelled));
}
