//! Transport abstraction and chunk sources for the playback engine.
//!
//! The engine never touches an audio device directly. It feeds decoded
//! chunks to an [`AudioTransport`] and reads ordered base64 chunks from a
//! [`ChunkSource`]; both seams swap out for scripted mocks in tests and for
//! a device-backed transport behind the `device-audio` feature.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::cache::VoiceCacheStore;
use crate::core::voice::VoiceId;

// =============================================================================
// Errors
// =============================================================================

/// Failures surfaced while fetching, decoding, or playing narration
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// Narration exists in the catalog but has no ready audio yet. Retryable.
    #[error("Narration for {content_id} (voice: {voice_id}) is not ready yet")]
    GenerationNotReady {
        content_id: String,
        voice_id: String,
    },

    /// A chunk failed base64 or codec decoding. The engine skips it.
    #[error("Chunk {index} could not be decoded: {reason}")]
    DecodeFailure { index: usize, reason: String },

    /// The audio transport refused or aborted a chunk
    #[error("Audio transport failure: {0}")]
    TransportFailure(String),

    /// The chunk fetch path failed (store or network)
    #[error("Chunk fetch failed: {0}")]
    FetchFailure(String),

    /// A control action arrived with no playback session to act on
    #[error("No active playback session")]
    NoSession,

    /// The caller cancelled the operation
    #[error("Playback operation cancelled")]
    Cancelled,
}

impl PlaybackError {
    /// Whether a later retry of the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaybackError::GenerationNotReady { .. } | PlaybackError::FetchFailure(_)
        )
    }
}

/// Decode one wire chunk back into raw audio bytes.
///
/// Round-trips exactly with the cache encoding; anything that does not is a
/// [`PlaybackError::DecodeFailure`] and never reaches a transport as noise.
pub fn decode_chunk(index: usize, encoded: &str) -> Result<Bytes, PlaybackError> {
    BASE64
        .decode(encoded)
        .map(Bytes::from)
        .map_err(|e| PlaybackError::DecodeFailure {
            index,
            reason: e.to_string(),
        })
}

// =============================================================================
// Transport
// =============================================================================

/// How a chunk's playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEnd {
    /// The chunk played to its natural end
    Finished,
    /// `stop()` cut the chunk short
    Interrupted,
}

/// One audio output driven a chunk at a time.
///
/// `play_chunk` resolves when the chunk ends, naturally or via `stop`.
/// Implementations must tolerate `pause`/`resume`/`stop` arriving from
/// other tasks while a chunk is in flight.
#[async_trait]
pub trait AudioTransport: Send + Sync {
    async fn play_chunk(&self, index: usize, audio: Bytes) -> Result<ChunkEnd, PlaybackError>;

    /// Hold the current chunk at its exact position
    fn pause(&self);

    /// Continue from the paused position
    fn resume(&self);

    /// Cut the current chunk short; a pending `play_chunk` resolves with
    /// [`ChunkEnd::Interrupted`]
    fn stop(&self);
}

// =============================================================================
// Chunk Sources
// =============================================================================

/// Ordered base64 chunk lists for one voice of one content item
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Fetch the chunk list. An empty result means nothing is ready.
    ///
    /// Long-running implementations honor `cancel` and return
    /// [`PlaybackError::Cancelled`] promptly.
    async fn fetch_chunks(
        &self,
        content_id: &str,
        voice: &VoiceId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PlaybackError>;
}

/// Chunk source reading directly from the voice cache
pub struct CacheChunkSource {
    cache: Arc<VoiceCacheStore>,
}

impl CacheChunkSource {
    pub fn new(cache: Arc<VoiceCacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ChunkSource for CacheChunkSource {
    async fn fetch_chunks(
        &self,
        content_id: &str,
        voice: &VoiceId,
        _cancel: &CancellationToken,
    ) -> Result<Vec<String>, PlaybackError> {
        let record = self
            .cache
            .load(content_id)
            .await
            .map_err(|e| PlaybackError::FetchFailure(e.to_string()))?;

        match record.ready_entry(voice) {
            Some(entry) => {
                debug!(
                    "Serving {} cached chunks for {content_id} (voice: {voice})",
                    entry.chunks.len()
                );
                Ok(entry.chunks.clone())
            }
            None => Err(PlaybackError::GenerationNotReady {
                content_id: content_id.to_string(),
                voice_id: voice.as_str().to_string(),
            }),
        }
    }
}
