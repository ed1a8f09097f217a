//! Listening progress, keyed by `(user_id, content_id)`.
//!
//! Upserts are idempotent: replaying the same record is a no-op and two
//! clients racing on the same key simply leave the last write in place.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a user stands in one piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProgressRecord {
    pub user_id: String,
    pub content_id: String,
    /// Percent listened, 0.0 through 100.0
    pub percentage: f64,
    /// Chunk index playback stands at
    pub chunk_index: usize,
    /// Unix seconds of the last update
    pub updated_at: i64,
    /// Unix seconds when the content was finished, set exactly once per
    /// completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl ProgressRecord {
    pub fn new(user_id: &str, content_id: &str, percentage: f64, chunk_index: usize) -> Self {
        Self {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            percentage,
            chunk_index,
            updated_at: time::OffsetDateTime::now_utc().unix_timestamp(),
            completed_at: None,
        }
    }

    /// A completed record: 100%, completion stamp set
    pub fn completed(user_id: &str, content_id: &str, final_chunk: usize) -> Self {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Self {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            percentage: 100.0,
            chunk_index: final_chunk,
            updated_at: now,
            completed_at: Some(now),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some() || self.percentage >= 100.0
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProgressError {
    #[error("Progress store unavailable: {0}")]
    Unavailable(String),
}

/// Durable progress storage
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Insert or replace the record for `(user_id, content_id)`
    async fn upsert(&self, record: ProgressRecord) -> Result<(), ProgressError>;

    async fn get(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<Option<ProgressRecord>, ProgressError>;
}

/// In-process progress store
#[derive(Default)]
pub struct MemoryProgressStore {
    records: DashMap<(String, String), ProgressRecord>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn upsert(&self, record: ProgressRecord) -> Result<(), ProgressError> {
        let key = (record.user_id.clone(), record.content_id.clone());
        self.records.insert(key, record);
        Ok(())
    }

    async fn get(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<Option<ProgressRecord>, ProgressError> {
        Ok(self
            .records
            .get(&(user_id.to_string(), content_id.to_string()))
            .map(|entry| entry.value().clone()))
    }
}
