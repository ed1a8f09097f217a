//! Voice cache store: persisted narration audio, one record per content item.
//!
//! Records live in an object store (local filesystem, S3, or in-memory for
//! tests) as JSON documents keyed by content id. Each record maps voice ids
//! to an entry holding the ordered base64 chunk list, byte length, an
//! explicit `ready` flag and a synthesized-at timestamp.
//!
//! Whether a cached voice is usable is decided by the `ready` flag alone.
//! A minimum byte floor is enforced when the entry is written (a truncated
//! provider response never gets flagged ready), but readers never re-derive
//! validity from size.
//!
//! All writes are read-merge-write against a fresh read so one voice's
//! persist can never clobber another's entry.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::synthesis::{AudioFormat, AudioPayload};
use crate::core::voice::VoiceId;

/// Payloads smaller than this are stored but never flagged ready
pub const DEFAULT_MIN_READY_BYTES: usize = 1024;

/// Errors produced by the voice cache store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("Cache record serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid cache store configuration: {0}")]
    Configuration(String),
}

// =============================================================================
// Record Types
// =============================================================================

fn default_format() -> AudioFormat {
    AudioFormat::Mp3
}

/// Cached narration for one voice of one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceEntry {
    /// Ordered base64-encoded audio chunks
    pub chunks: Vec<String>,
    /// Total decoded byte length across chunks
    pub byte_len: u64,
    /// Explicit success flag; only ready entries are served or counted
    pub ready: bool,
    /// Unix timestamp of synthesis completion
    pub synthesized_at: i64,
    /// Container format of the chunks
    #[serde(default = "default_format")]
    pub format: AudioFormat,
}

impl VoiceEntry {
    /// Build an entry from synthesized payloads, applying the write-time
    /// byte floor to the `ready` flag.
    pub fn from_payloads(payloads: &[AudioPayload], min_ready_bytes: usize) -> Self {
        let byte_len: u64 = payloads.iter().map(|p| p.len() as u64).sum();
        let chunks = payloads
            .iter()
            .map(|p| BASE64.encode(&p.data))
            .collect::<Vec<_>>();
        let format = payloads
            .first()
            .map(|p| p.format)
            .unwrap_or(AudioFormat::Mp3);

        Self {
            chunks,
            byte_len,
            ready: !payloads.is_empty() && byte_len >= min_ready_bytes as u64,
            synthesized_at: time::OffsetDateTime::now_utc().unix_timestamp(),
            format,
        }
    }

    /// Decode every chunk back to raw bytes, in order
    pub fn decode_chunks(&self) -> Result<Vec<Bytes>, base64::DecodeError> {
        self.chunks
            .iter()
            .map(|c| BASE64.decode(c).map(Bytes::from))
            .collect()
    }
}

/// Per-content cache record mapping voice ids to entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceCacheRecord {
    pub content_id: String,
    #[serde(default)]
    pub voices: BTreeMap<String, VoiceEntry>,
    /// Unix timestamp of the last merge
    #[serde(default)]
    pub updated_at: i64,
}

impl VoiceCacheRecord {
    /// An empty record for a content item with no cached audio
    pub fn empty(content_id: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            ..Default::default()
        }
    }

    /// Whether the given voice has a ready entry
    pub fn is_voice_ready(&self, voice: &VoiceId) -> bool {
        self.voices.get(voice.as_str()).is_some_and(|e| e.ready)
    }

    /// Ready entry for a voice, if present
    pub fn ready_entry(&self, voice: &VoiceId) -> Option<&VoiceEntry> {
        self.voices.get(voice.as_str()).filter(|e| e.ready)
    }

    /// Count of required voices with ready entries
    pub fn ready_voice_count(&self, required: &[VoiceId]) -> usize {
        required.iter().filter(|v| self.is_voice_ready(v)).count()
    }

    /// Required voices without a ready entry, in required order
    pub fn missing_voices(&self, required: &[VoiceId]) -> Vec<VoiceId> {
        required
            .iter()
            .filter(|v| !self.is_voice_ready(v))
            .cloned()
            .collect()
    }
}

// =============================================================================
// Store Construction
// =============================================================================

/// Where voice cache records are persisted
#[derive(Debug, Clone, Default)]
pub enum StoreLocation {
    /// Process-local store, lost on restart. Default for tests and dev.
    #[default]
    Memory,
    /// Local filesystem root
    Filesystem(PathBuf),
    /// S3-compatible bucket
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
    },
}

/// Build the object store backend for a [`StoreLocation`]
pub fn build_store(location: &StoreLocation) -> Result<Arc<dyn ObjectStore>, CacheError> {
    match location {
        StoreLocation::Memory => Ok(Arc::new(object_store::memory::InMemory::new())),
        StoreLocation::Filesystem(path) => {
            std::fs::create_dir_all(path).map_err(|e| {
                CacheError::Configuration(format!(
                    "Cannot create cache directory {}: {e}",
                    path.display()
                ))
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(path)?;
            Ok(Arc::new(store))
        }
        StoreLocation::S3 {
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
        } => {
            let mut builder =
                object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);
            if let Some(region) = region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            if let Some(access_key) = access_key {
                builder = builder.with_access_key_id(access_key);
            }
            if let Some(secret_key) = secret_key {
                builder = builder.with_secret_access_key(secret_key);
            }
            Ok(Arc::new(builder.build()?))
        }
    }
}

// =============================================================================
// Voice Cache Store
// =============================================================================

/// Persisted voice cache over an object store
pub struct VoiceCacheStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    min_ready_bytes: usize,
}

impl VoiceCacheStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>, min_ready_bytes: usize) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            min_ready_bytes,
        }
    }

    /// In-memory store with default settings, for tests and local dev
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(object_store::memory::InMemory::new()),
            "narration",
            DEFAULT_MIN_READY_BYTES,
        )
    }

    /// Byte floor below which entries are stored not-ready
    pub fn min_ready_bytes(&self) -> usize {
        self.min_ready_bytes
    }

    fn record_path(&self, content_id: &str) -> StorePath {
        StorePath::from(format!("{}/{}.json", self.prefix, content_id))
    }

    /// Load the record for a content item; a missing object is an empty
    /// record, not an error.
    pub async fn load(&self, content_id: &str) -> Result<VoiceCacheRecord, CacheError> {
        let path = self.record_path(content_id);
        match self.store.get(&path).await {
            Ok(result) => {
                let data = result.bytes().await?;
                let record: VoiceCacheRecord = serde_json::from_slice(&data)?;
                Ok(record)
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!("No cache record for {content_id}, starting empty");
                Ok(VoiceCacheRecord::empty(content_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Merge one voice entry into the record and persist.
    ///
    /// Always re-reads the freshest record first; the caller's view of the
    /// record is never trusted for the write.
    pub async fn merge_voice(
        &self,
        content_id: &str,
        voice: &VoiceId,
        entry: VoiceEntry,
    ) -> Result<VoiceCacheRecord, CacheError> {
        let mut record = self.load(content_id).await?;
        if record.content_id.is_empty() {
            record.content_id = content_id.to_string();
        }
        record.voices.insert(voice.as_str().to_string(), entry);
        record.updated_at = time::OffsetDateTime::now_utc().unix_timestamp();

        let data = serde_json::to_vec(&record)?;
        let path = self.record_path(content_id);
        self.store
            .put(&path, PutPayload::from(Bytes::from(data)))
            .await?;
        Ok(record)
    }

    /// Encode synthesized payloads into a voice entry and merge-persist it.
    ///
    /// Returns the merged record; callers check `is_voice_ready` on it since
    /// a payload under the byte floor persists as not ready.
    pub async fn store_payloads(
        &self,
        content_id: &str,
        voice: &VoiceId,
        payloads: &[AudioPayload],
    ) -> Result<VoiceCacheRecord, CacheError> {
        let entry = VoiceEntry::from_payloads(payloads, self.min_ready_bytes);
        if !entry.ready {
            warn!(
                "Voice {voice} for {content_id} stored not-ready ({} bytes, floor {})",
                entry.byte_len, self.min_ready_bytes
            );
        }
        self.merge_voice(content_id, voice, entry).await
    }
}
