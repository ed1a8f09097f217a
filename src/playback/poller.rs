//! Readiness polling: wait, bounded, for narration chunks to appear.
//!
//! The poller fires a generation trigger once, then polls the chunk source
//! until the first non-empty list, the budget runs out, or the caller
//! cancels. Trigger failures are logged and never fatal; generation may
//! already be running from an earlier request.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::voice::VoiceId;
use crate::playback::transport::{ChunkSource, PlaybackError};

/// Gap between chunk list fetches (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_500;

/// Total time allowed before giving up (seconds)
pub const DEFAULT_POLL_BUDGET_SECS: u64 = 30;

#[derive(Debug, Clone, Error)]
#[error("Generation trigger failed: {0}")]
pub struct TriggerError(pub String);

/// Kicks off narration generation for a voice. Implementations return as
/// soon as the work is dispatched; nobody awaits the outcome here.
#[async_trait]
pub trait GenerationTrigger: Send + Sync {
    async fn trigger(&self, content_id: &str, voice: &VoiceId) -> Result<(), TriggerError>;
}

/// Timing knobs for the poll loop
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    pub budget: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            budget: Duration::from_secs(DEFAULT_POLL_BUDGET_SECS),
        }
    }
}

/// Budget-bounded chunk availability poller
pub struct ReadinessPoller {
    source: Arc<dyn ChunkSource>,
    trigger: Arc<dyn GenerationTrigger>,
    settings: PollerSettings,
}

impl ReadinessPoller {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        trigger: Arc<dyn GenerationTrigger>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            source,
            trigger,
            settings,
        }
    }

    /// Poll until chunks exist for `(content_id, voice)`.
    ///
    /// The cancellation token is checked before every fetch; cancelling
    /// returns [`PlaybackError::Cancelled`] without another fetch. An
    /// exhausted budget returns [`PlaybackError::GenerationNotReady`],
    /// which callers may retry.
    pub async fn wait_for_chunks(
        &self,
        content_id: &str,
        voice: &VoiceId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PlaybackError> {
        if cancel.is_cancelled() {
            return Err(PlaybackError::Cancelled);
        }

        if let Err(e) = self.trigger.trigger(content_id, voice).await {
            warn!("Generation trigger for {content_id} (voice: {voice}) failed: {e}");
        }

        let deadline = tokio::time::Instant::now() + self.settings.budget;
        loop {
            if cancel.is_cancelled() {
                return Err(PlaybackError::Cancelled);
            }

            match self.source.fetch_chunks(content_id, voice, cancel).await {
                Ok(chunks) if !chunks.is_empty() => {
                    debug!(
                        "Narration for {content_id} (voice: {voice}) ready with {} chunks",
                        chunks.len()
                    );
                    return Ok(chunks);
                }
                Ok(_) => {
                    debug!("Chunk list for {content_id} (voice: {voice}) still empty");
                }
                Err(PlaybackError::Cancelled) => return Err(PlaybackError::Cancelled),
                Err(e) if e.is_retryable() => {
                    debug!("Narration for {content_id} (voice: {voice}) not ready: {e}");
                }
                Err(e) => return Err(e),
            }

            // Give up rather than start a sleep that would overrun the budget
            if tokio::time::Instant::now() + self.settings.poll_interval >= deadline {
                warn!(
                    "Narration for {content_id} (voice: {voice}) not ready within {:?}",
                    self.settings.budget
                );
                return Err(PlaybackError::GenerationNotReady {
                    content_id: content_id.to_string(),
                    voice_id: voice.as_str().to_string(),
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(PlaybackError::Cancelled),
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }
}

#[async_trait]
impl ChunkSource for ReadinessPoller {
    async fn fetch_chunks(
        &self,
        content_id: &str,
        voice: &VoiceId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PlaybackError> {
        self.wait_for_chunks(content_id, voice, cancel).await
    }
}
