//! Content catalog: the set of summaries eligible for narration.
//!
//! The catalog is the scanner's source of truth. Implementations only need
//! listing and point lookup; generation state lives in the voice cache, never
//! here.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A summarized title eligible for narration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContentItem {
    /// Stable content identifier
    pub content_id: String,
    /// Display title
    pub title: String,
    /// Summary text to narrate
    pub summary_text: String,
}

/// Errors produced by catalog implementations
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Listing the catalog failed. Fatal for the invocation that needed the
    /// listing; there is no internal retry.
    #[error("Failed to list content catalog: {0}")]
    ListFailed(String),

    #[error("Content not found: {0}")]
    NotFound(String),
}

/// Read access to the narration catalog
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// List every eligible item in stable (content id) order
    async fn list(&self) -> Result<Vec<ContentItem>, CatalogError>;

    /// Fetch one item by id
    async fn get(&self, content_id: &str) -> Result<ContentItem, CatalogError>;
}

/// In-memory catalog backed by a concurrent map.
///
/// `list` returns items sorted by content id so repeated scans see a stable
/// order.
#[derive(Default)]
pub struct MemoryCatalog {
    items: DashMap<String, ContentItem>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item
    pub fn insert(&self, item: ContentItem) {
        self.items.insert(item.content_id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ContentCatalog for MemoryCatalog {
    async fn list(&self) -> Result<Vec<ContentItem>, CatalogError> {
        let mut items: Vec<ContentItem> =
            self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by(|a, b| a.content_id.cmp(&b.content_id));
        Ok(items)
    }

    async fn get(&self, content_id: &str) -> Result<ContentItem, CatalogError> {
        self.items
            .get(content_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CatalogError::NotFound(content_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> ContentItem {
        ContentItem {
            content_id: id.to_string(),
            title: format!("Title {id}"),
            summary_text: format!("Summary for {id}."),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let catalog = MemoryCatalog::new();
        catalog.insert(item("book-1"));

        let found = catalog.get("book-1").await.unwrap();
        assert_eq!(found.title, "Title book-1");

        let missing = catalog.get("book-2").await;
        assert!(matches!(missing, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_stable() {
        let catalog = MemoryCatalog::new();
        catalog.insert(item("c"));
        catalog.insert(item("a"));
        catalog.insert(item("b"));

        let first = catalog.list().await.unwrap();
        let second = catalog.list().await.unwrap();
        let ids: Vec<&str> = first.iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_insert_replaces_existing() {
        let catalog = MemoryCatalog::new();
        catalog.insert(item("book-1"));
        catalog.insert(ContentItem {
            content_id: "book-1".to_string(),
            title: "Updated".to_string(),
            summary_text: "New text.".to_string(),
        });

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("book-1").await.unwrap().title, "Updated");
    }
}
