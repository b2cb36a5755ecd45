//! Soft-deletion of feed rows whose source entities disappeared.

use std::collections::BTreeSet;

use tracing::info;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::source::SourceQuery;
use crate::store::FeedStore;
use crate::types::EntityId;

/// Flags feed rows as removed when their source rows no longer exist.
///
/// The feed-versus-source anti-join is expressed through the source's
/// delete-check capability: one batched existence query, then the complement
/// of its result is flagged in the store. Running before fetch/transform
/// guarantees that an entity found missing here and an entity found missing
/// during fetch converge on the same tombstone representation.
#[derive(Debug)]
pub struct DeletionResolver<'a, Q, S> {
    source: &'a Q,
    store: &'a S,
    metadata: &'a FeedIndexMetadata,
}

impl<'a, Q, S> DeletionResolver<'a, Q, S>
where
    Q: SourceQuery + Sync,
    S: FeedStore + Sync,
{
    /// Creates a resolver over the given source and store.
    pub fn new(source: &'a Q, store: &'a S, metadata: &'a FeedIndexMetadata) -> Self {
        Self {
            source,
            store,
            metadata,
        }
    }

    /// Flags the feed rows of vanished entities among `ids` as deleted.
    ///
    /// Idempotent: entities already flagged, and ids without a feed row, do
    /// not change state. Returns the number of rows newly flagged.
    pub async fn mark_removed(&self, ids: &[EntityId]) -> FeedResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let existing = self.source.existing_ids(self.metadata, ids).await?;

        // The input may repeat ids; the set both dedupes and drops the ids
        // that are still present in the source.
        let gone: BTreeSet<EntityId> = ids
            .iter()
            .filter(|id| !existing.contains(id))
            .copied()
            .collect();

        if gone.is_empty() {
            return Ok(0);
        }

        let gone: Vec<EntityId> = gone.into_iter().collect();
        let flagged = self.store.flag_removed(self.metadata, &gone).await?;

        if flagged > 0 {
            info!(
                "flagged {} of {} vanished entities as removed in feed '{}'",
                flagged,
                gone.len(),
                self.metadata.feed_name
            );
        }

        Ok(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FeedStore;
    use crate::store::memory::MemoryFeedStore;
    use crate::test_utils::{MemorySource, test_metadata};
    use crate::types::FeedRow;
    use serde_json::json;

    async fn seed_feed(store: &MemoryFeedStore, metadata: &FeedIndexMetadata, ids: &[i64]) {
        let rows: Vec<FeedRow> = ids
            .iter()
            .map(|&id| {
                let entity_id = EntityId::new(id);
                FeedRow::new(
                    metadata.row_identity(entity_id),
                    entity_id,
                    json!({"entity_id": id}),
                )
            })
            .collect();
        store.upsert(metadata, rows).await.unwrap();
    }

    #[tokio::test]
    async fn flags_only_rows_missing_from_the_source() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        let store = MemoryFeedStore::new();

        // Source has 1-3; the feed still carries a row for 4.
        for id in [1, 2, 3] {
            source.insert_row(EntityId::new(id), json!({"entity_id": id})).await;
        }
        seed_feed(&store, &metadata, &[1, 2, 3, 4]).await;

        let resolver = DeletionResolver::new(&source, &store, &metadata);
        let ids: Vec<EntityId> = [1, 2, 3, 4].map(EntityId::new).to_vec();
        let flagged = resolver.mark_removed(&ids).await.unwrap();

        assert_eq!(flagged, 1);
        assert!(store.row(EntityId::new(4)).await.unwrap().is_deleted);
        for id in [1, 2, 3] {
            assert!(!store.row(EntityId::new(id)).await.unwrap().is_deleted);
        }
    }

    #[tokio::test]
    async fn rerunning_with_the_same_ids_changes_nothing() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        let store = MemoryFeedStore::new();

        source
            .insert_row(EntityId::new(1), json!({"entity_id": 1}))
            .await;
        seed_feed(&store, &metadata, &[1, 2]).await;

        let resolver = DeletionResolver::new(&source, &store, &metadata);
        let ids = vec![EntityId::new(1), EntityId::new(2)];

        assert_eq!(resolver.mark_removed(&ids).await.unwrap(), 1);
        let after_first = store.rows().await;

        assert_eq!(resolver.mark_removed(&ids).await.unwrap(), 0);
        assert_eq!(store.rows().await, after_first);
    }

    #[tokio::test]
    async fn ids_without_feed_rows_are_ignored() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        let store = MemoryFeedStore::new();

        let resolver = DeletionResolver::new(&source, &store, &metadata);
        let flagged = resolver.mark_removed(&[EntityId::new(9)]).await.unwrap();

        assert_eq!(flagged, 0);
        assert!(store.rows().await.is_empty());
    }
}
