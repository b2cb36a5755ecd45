use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::store::FeedStore;
use crate::types::{EntityId, FeedRow};

/// Inner state of [`MemoryFeedStore`].
#[derive(Debug)]
struct Inner {
    /// Feed rows keyed by entity id.
    rows: BTreeMap<EntityId, FeedRow>,
    /// Size of every chunk written so far, in write order.
    upsert_chunks: Vec<usize>,
    /// Number of truncations performed.
    truncates: u64,
}

/// In-memory feed store for testing and development purposes.
///
/// [`MemoryFeedStore`] keeps the whole feed table in memory and records every
/// chunk write and truncation so tests can assert on batching behavior. The
/// conflict semantics mirror the default feed table layout: `payload` and
/// `is_deleted` are treated as the mutable columns, the identity is
/// preserved.
#[derive(Debug, Clone)]
pub struct MemoryFeedStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFeedStore {
    /// Creates a new empty memory store.
    pub fn new() -> Self {
        let inner = Inner {
            rows: BTreeMap::new(),
            upsert_chunks: Vec::new(),
            truncates: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns a snapshot of all feed rows in entity key order.
    pub async fn rows(&self) -> Vec<FeedRow> {
        let inner = self.inner.lock().await;
        inner.rows.values().cloned().collect()
    }

    /// Returns the feed row for one entity, if present.
    pub async fn row(&self, entity_id: EntityId) -> Option<FeedRow> {
        let inner = self.inner.lock().await;
        inner.rows.get(&entity_id).cloned()
    }

    /// Returns the size of every chunk written so far, in write order.
    pub async fn upsert_chunk_sizes(&self) -> Vec<usize> {
        let inner = self.inner.lock().await;
        inner.upsert_chunks.clone()
    }

    /// Returns how many times the table was truncated.
    pub async fn truncate_count(&self) -> u64 {
        let inner = self.inner.lock().await;
        inner.truncates
    }

    /// Clears rows and recorded bookkeeping.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.rows.clear();
        inner.upsert_chunks.clear();
        inner.truncates = 0;
    }
}

impl Default for MemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore for MemoryFeedStore {
    async fn truncate(&self, metadata: &FeedIndexMetadata) -> FeedResult<()> {
        let mut inner = self.inner.lock().await;

        info!("truncating feed table {}", metadata.feed_table);

        inner.rows.clear();
        inner.truncates += 1;

        Ok(())
    }

    async fn flag_removed(
        &self,
        _metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> FeedResult<u64> {
        let mut inner = self.inner.lock().await;

        let mut flagged = 0;
        for id in ids {
            if let Some(row) = inner.rows.get_mut(id)
                && !row.is_deleted
            {
                row.is_deleted = true;
                flagged += 1;
            }
        }

        Ok(flagged)
    }

    async fn upsert_chunk(
        &self,
        _metadata: &FeedIndexMetadata,
        rows: &[FeedRow],
    ) -> FeedResult<()> {
        let mut inner = self.inner.lock().await;

        inner.upsert_chunks.push(rows.len());

        for row in rows {
            match inner.rows.get_mut(&row.entity_id) {
                Some(existing) => {
                    // Mutable columns only; the stored identity stays as is.
                    existing.payload = row.payload.clone();
                    existing.is_deleted = row.is_deleted;
                }
                None => {
                    inner.rows.insert(row.entity_id, row.clone());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FeedIndexMetadata;
    use feed_postgres::schema::TableName;
    use serde_json::json;

    fn metadata_with_batch_size(batch_size: usize) -> FeedIndexMetadata {
        FeedIndexMetadata::new(
            "product_prices",
            TableName::new("catalog", "prices"),
            "entity_id",
            TableName::new("catalog", "price_feed"),
            "entity_id",
        )
        .with_batch_size(batch_size)
    }

    fn row(metadata: &FeedIndexMetadata, id: i64) -> FeedRow {
        let entity_id = EntityId::new(id);
        FeedRow::new(
            metadata.row_identity(entity_id),
            entity_id,
            json!({"entity_id": id}),
        )
    }

    #[tokio::test]
    async fn upsert_splits_into_ceil_n_over_b_chunks() {
        let metadata = metadata_with_batch_size(100);
        let store = MemoryFeedStore::new();

        let rows: Vec<FeedRow> = (1..=250).map(|id| row(&metadata, id)).collect();
        store.upsert(&metadata, rows).await.unwrap();

        assert_eq!(store.upsert_chunk_sizes().await, vec![100, 100, 50]);
        assert_eq!(store.rows().await.len(), 250);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_key() {
        let metadata = metadata_with_batch_size(10);
        let store = MemoryFeedStore::new();

        let rows: Vec<FeedRow> = (1..=5).map(|id| row(&metadata, id)).collect();
        store.upsert(&metadata, rows.clone()).await.unwrap();
        let first_pass = store.rows().await;

        store.upsert(&metadata, rows).await.unwrap();
        assert_eq!(store.rows().await, first_pass);
    }

    #[tokio::test]
    async fn flag_removed_changes_state_once() {
        let metadata = metadata_with_batch_size(10);
        let store = MemoryFeedStore::new();

        store
            .upsert(&metadata, vec![row(&metadata, 1), row(&metadata, 2)])
            .await
            .unwrap();

        let flagged = store
            .flag_removed(&metadata, &[EntityId::new(2), EntityId::new(3)])
            .await
            .unwrap();
        assert_eq!(flagged, 1);

        // Second run finds nothing left to flag.
        let flagged = store
            .flag_removed(&metadata, &[EntityId::new(2), EntityId::new(3)])
            .await
            .unwrap();
        assert_eq!(flagged, 0);

        let row = store.row(EntityId::new(2)).await.unwrap();
        assert!(row.is_deleted);
        assert!(!store.row(EntityId::new(1)).await.unwrap().is_deleted);
    }

    #[tokio::test]
    async fn truncate_empties_the_table() {
        let metadata = metadata_with_batch_size(10);
        let store = MemoryFeedStore::new();

        store.upsert(&metadata, vec![row(&metadata, 1)]).await.unwrap();
        store.truncate(&metadata).await.unwrap();

        assert!(store.rows().await.is_empty());
        assert_eq!(store.truncate_count().await, 1);
    }
}
