//! Chunk playback engine.
//!
//! Drives an ordered chunk sequence through an [`AudioTransport`], one
//! chunk at a time, with pause/resume/stop/seek/skip controls and progress
//! persistence. The engine owns a single driver task per session; starting
//! a new session tears the previous one down first.
//!
//! Progress writes are deliberately sparse: one write when playback enters
//! a new 10% decade, one at stop (zero), one at completion (100%). A store
//! that rejects a write costs a log line, never the playback session.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::voice::VoiceId;
use crate::playback::chunk;
use crate::playback::progress::{ProgressRecord, ProgressStore};
use crate::playback::transport::{
    AudioTransport, ChunkEnd, ChunkSource, PlaybackError, decode_chunk,
};

// =============================================================================
// States
// =============================================================================

/// Engine lifecycle. `stop()` returns the engine to `Idle`; there is no
/// resting `Stopped` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EngineState {
    Idle,
    Loading,
    Playing,
    Paused,
    Completed,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Loading => "loading",
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
            EngineState::Completed => "completed",
        }
    }
}

/// Invoked once per completed session with `(content_id, voice)`
pub type CompletionCallback = Box<dyn Fn(&str, &VoiceId) + Send + Sync>;

// =============================================================================
// Session
// =============================================================================

/// Bookkeeping for one play() invocation
struct Session {
    user_id: String,
    content_id: String,
    voice: VoiceId,
    chunks: Vec<String>,
    total: usize,
    current_index: AtomicUsize,
    /// Target index set by seek/skip; consumed by the driver at the next
    /// chunk end
    pending_jump: Mutex<Option<usize>>,
    cancel: CancellationToken,
    completion_signaled: AtomicBool,
    last_persisted_decade: Mutex<Option<u8>>,
}

struct EngineInner {
    transport: Arc<dyn AudioTransport>,
    source: Arc<dyn ChunkSource>,
    progress: Arc<dyn ProgressStore>,
    state: Mutex<EngineState>,
    session: Mutex<Option<Arc<Session>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    on_complete: Mutex<Option<CompletionCallback>>,
}

// =============================================================================
// Playback Engine
// =============================================================================

/// Cloneable handle to one playback engine
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

impl PlaybackEngine {
    pub fn new(
        transport: Arc<dyn AudioTransport>,
        source: Arc<dyn ChunkSource>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                transport,
                source,
                progress,
                state: Mutex::new(EngineState::Idle),
                session: Mutex::new(None),
                driver: Mutex::new(None),
                on_complete: Mutex::new(None),
            }),
        }
    }

    /// Register the completion callback. Called exactly once per session
    /// that reaches the end of its chunk sequence.
    pub fn set_completion_callback(
        &self,
        callback: impl Fn(&str, &VoiceId) + Send + Sync + 'static,
    ) {
        *self.inner.on_complete.lock() = Some(Box::new(callback));
    }

    pub fn state(&self) -> EngineState {
        *self.inner.state.lock()
    }

    /// Index of the chunk playback currently stands at
    pub fn current_chunk(&self) -> Option<usize> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.current_index.load(Ordering::SeqCst))
    }

    /// Start playback of one voice of one content item.
    ///
    /// Resumes from persisted progress when a record exists (a completed
    /// record restarts from the beginning). Any failure to obtain or decode
    /// the starting chunk surfaces as this call's single error and leaves
    /// the engine `Idle`.
    pub async fn play(
        &self,
        user_id: &str,
        content_id: &str,
        voice: &VoiceId,
    ) -> Result<(), PlaybackError> {
        self.teardown().await;
        *self.inner.state.lock() = EngineState::Loading;

        let cancel = CancellationToken::new();
        let chunks = match self
            .inner
            .source
            .fetch_chunks(content_id, voice, &cancel)
            .await
        {
            Ok(chunks) if !chunks.is_empty() => chunks,
            Ok(_) => {
                *self.inner.state.lock() = EngineState::Idle;
                return Err(PlaybackError::GenerationNotReady {
                    content_id: content_id.to_string(),
                    voice_id: voice.as_str().to_string(),
                });
            }
            Err(e) => {
                *self.inner.state.lock() = EngineState::Idle;
                return Err(e);
            }
        };
        let total = chunks.len();

        let start = match self.inner.progress.get(user_id, content_id).await {
            Ok(Some(saved)) if !saved.is_completed() => saved.chunk_index.min(total - 1),
            Ok(Some(_)) => 0,
            Ok(None) => 0,
            Err(e) => {
                warn!("Reading progress for {user_id}/{content_id} failed, starting over: {e}");
                0
            }
        };

        // The starting chunk must decode; a broken opening chunk is this
        // call's failure, not something to skip past silently
        if let Err(e) = decode_chunk(start, &chunks[start]) {
            *self.inner.state.lock() = EngineState::Idle;
            return Err(e);
        }

        info!(
            "Starting playback of {content_id} (voice: {voice}) at chunk {start}/{total} for {user_id}"
        );

        let session = Arc::new(Session {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            voice: voice.clone(),
            chunks,
            total,
            current_index: AtomicUsize::new(start),
            pending_jump: Mutex::new(None),
            cancel,
            completion_signaled: AtomicBool::new(false),
            last_persisted_decade: Mutex::new(None),
        });
        *self.inner.session.lock() = Some(Arc::clone(&session));
        *self.inner.state.lock() = EngineState::Playing;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            EngineInner::drive(inner, session).await;
        });
        *self.inner.driver.lock() = Some(handle);
        Ok(())
    }

    /// Hold playback at its exact position. No-op outside `Playing`.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if *state == EngineState::Playing {
            self.inner.transport.pause();
            *state = EngineState::Paused;
            debug!("Playback paused at chunk {:?}", self.current_chunk());
        }
    }

    /// Continue from the paused position. No-op outside `Paused`.
    pub fn resume(&self) {
        let mut state = self.inner.state.lock();
        if *state == EngineState::Paused {
            self.inner.transport.resume();
            *state = EngineState::Playing;
            debug!("Playback resumed at chunk {:?}", self.current_chunk());
        }
    }

    /// Tear down the session, persist zero progress, return to `Idle`.
    ///
    /// Stopping an already-completed session does not overwrite the
    /// persisted 100% record.
    pub async fn stop(&self) {
        let was = self.state();
        let session = self.teardown().await;
        *self.inner.state.lock() = EngineState::Idle;

        if let Some(session) = session {
            let active = matches!(
                was,
                EngineState::Loading | EngineState::Playing | EngineState::Paused
            );
            if active {
                let zero = ProgressRecord::new(&session.user_id, &session.content_id, 0.0, 0);
                if let Err(e) = self.inner.progress.upsert(zero).await {
                    warn!(
                        "Persisting stop for {}/{} failed: {e}",
                        session.user_id, session.content_id
                    );
                }
                info!("Playback of {} stopped", session.content_id);
            }
        }
    }

    /// Jump to the chunk a percentage resolves to and restart it from its
    /// beginning. Seeking to the current chunk restarts that chunk.
    ///
    /// Returns the target chunk index.
    pub fn seek(&self, percentage: f64) -> Result<usize, PlaybackError> {
        self.jump(|_, total| chunk::seek_target(percentage, total).unwrap_or(0))
    }

    /// Advance one chunk, clamped to the final chunk
    pub fn skip_forward(&self) -> Result<usize, PlaybackError> {
        self.jump(chunk::skip_forward)
    }

    /// Step back one chunk, clamped to the first chunk
    pub fn skip_back(&self) -> Result<usize, PlaybackError> {
        self.jump(|current, _| chunk::skip_back(current))
    }

    fn jump(&self, target_for: impl FnOnce(usize, usize) -> usize) -> Result<usize, PlaybackError> {
        let session = self
            .inner
            .session
            .lock()
            .as_ref()
            .map(Arc::clone)
            .ok_or(PlaybackError::NoSession)?;

        let mut state = self.inner.state.lock();
        if !matches!(*state, EngineState::Playing | EngineState::Paused) {
            return Err(PlaybackError::NoSession);
        }

        let current = session.current_index.load(Ordering::SeqCst);
        let target = target_for(current, session.total);
        *session.pending_jump.lock() = Some(target);
        // Cut the in-flight chunk short; the driver picks up the jump
        self.inner.transport.stop();
        *state = EngineState::Playing;
        debug!("Playback jump {current} -> {target}");
        Ok(target)
    }

    /// Cancel the driver and quiesce the transport. Returns the session
    /// that was active, if any.
    async fn teardown(&self) -> Option<Arc<Session>> {
        let session = self.inner.session.lock().take();
        if let Some(session) = &session {
            session.cancel.cancel();
            self.inner.transport.stop();
        }
        let driver = self.inner.driver.lock().take();
        if let Some(handle) = driver {
            let _ = handle.await;
        }
        session
    }
}

impl EngineInner {
    /// Driver task: walk the chunk sequence until completion or teardown
    async fn drive(inner: Arc<EngineInner>, session: Arc<Session>) {
        let mut index = session.current_index.load(Ordering::SeqCst);
        loop {
            if session.cancel.is_cancelled() {
                return;
            }
            if index >= session.total {
                EngineInner::complete(&inner, &session).await;
                return;
            }

            session.current_index.store(index, Ordering::SeqCst);
            EngineInner::persist_decade(&inner, &session, index).await;

            let audio = match decode_chunk(index, &session.chunks[index]) {
                Ok(audio) => audio,
                Err(e) => {
                    warn!(
                        "Skipping undecodable chunk {index} of {}: {e}",
                        session.content_id
                    );
                    index += 1;
                    continue;
                }
            };

            let end = tokio::select! {
                biased;
                _ = session.cancel.cancelled() => return,
                end = inner.transport.play_chunk(index, audio) => end,
            };
            match end {
                Ok(ChunkEnd::Finished) => {
                    if let Some(jump) = session.pending_jump.lock().take() {
                        index = jump;
                        continue;
                    }
                    index += 1;
                }
                Ok(ChunkEnd::Interrupted) => {
                    if session.cancel.is_cancelled() {
                        return;
                    }
                    if let Some(jump) = session.pending_jump.lock().take() {
                        index = jump;
                        continue;
                    }
                    // Interrupted with nothing queued: treat as a stop
                    return;
                }
                Err(e) => {
                    warn!(
                        "Transport failed on chunk {index} of {}, skipping: {e}",
                        session.content_id
                    );
                    index += 1;
                }
            }
        }
    }

    /// Persist progress when the decade changed since the last write
    async fn persist_decade(inner: &Arc<EngineInner>, session: &Session, index: usize) {
        let percentage = chunk::progress_percentage(index, session.total);
        let current_decade = chunk::decade(percentage);
        let should_write = {
            let mut last = session.last_persisted_decade.lock();
            if chunk::crosses_decade(*last, current_decade) {
                *last = Some(current_decade);
                true
            } else {
                false
            }
        };
        if !should_write {
            return;
        }

        let record = ProgressRecord::new(&session.user_id, &session.content_id, percentage, index);
        if let Err(e) = inner.progress.upsert(record).await {
            warn!(
                "Persisting progress for {}/{} failed: {e}",
                session.user_id, session.content_id
            );
        }
    }

    /// Record completion and signal the callback, at most once per session
    async fn complete(inner: &Arc<EngineInner>, session: &Session) {
        if session.completion_signaled.swap(true, Ordering::SeqCst) {
            return;
        }

        let final_chunk = session.total.saturating_sub(1);
        let record =
            ProgressRecord::completed(&session.user_id, &session.content_id, final_chunk);
        if let Err(e) = inner.progress.upsert(record).await {
            warn!(
                "Persisting completion for {}/{} failed: {e}",
                session.user_id, session.content_id
            );
        }

        *inner.state.lock() = EngineState::Completed;
        info!(
            "Playback of {} (voice: {}) completed",
            session.content_id, session.voice
        );

        let callback = inner.on_complete.lock();
        if let Some(callback) = callback.as_ref() {
            callback(&session.content_id, &session.voice);
        }
    }
}
