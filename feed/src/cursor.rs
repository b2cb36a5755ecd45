//! Paged streaming of changed-entity ids out of the source table.

use futures::Stream;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::source::SourceQuery;
use crate::types::EntityId;

/// Restartable pull-based cursor over source entity ids.
///
/// Yields ascending pages of at most [`FeedIndexMetadata::batch_size`] ids,
/// each page strictly after the previous one. The position advances to the
/// last id of every returned page, so [`ChangeLogCursor::position`] can be
/// persisted externally and fed back through
/// [`ChangeLogCursor::from_position`] to resume after a crash.
///
/// Only the full-rebuild path uses this; incremental triggers arrive with
/// explicit id lists.
#[derive(Debug)]
pub struct ChangeLogCursor<'a, Q> {
    source: &'a Q,
    metadata: &'a FeedIndexMetadata,
    position: Option<EntityId>,
    done: bool,
}

impl<'a, Q> ChangeLogCursor<'a, Q>
where
    Q: SourceQuery,
{
    /// Creates a cursor starting at the beginning of the source table.
    pub fn new(source: &'a Q, metadata: &'a FeedIndexMetadata) -> Self {
        Self::from_position(source, metadata, None)
    }

    /// Creates a cursor resuming after the given position.
    pub fn from_position(
        source: &'a Q,
        metadata: &'a FeedIndexMetadata,
        position: Option<EntityId>,
    ) -> Self {
        Self {
            source,
            metadata,
            position,
            done: false,
        }
    }

    /// Returns the current position: the last id handed out, if any.
    pub fn position(&self) -> Option<EntityId> {
        self.position
    }

    /// Fetches the next page of ids.
    ///
    /// Returns `None` once an empty page is seen; the cursor stays exhausted
    /// afterwards. Data-access failures propagate unchanged and do not
    /// advance the position, so the failed page can simply be re-pulled.
    pub async fn next_batch(&mut self) -> FeedResult<Option<Vec<EntityId>>> {
        if self.done {
            return Ok(None);
        }

        let ids = self
            .source
            .next_ids(self.metadata, self.position, self.metadata.batch_size)
            .await?;

        if ids.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.position = ids.last().copied();

        Ok(Some(ids))
    }

    /// Adapts the cursor into a stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = FeedResult<Vec<EntityId>>> + 'a
    where
        Q: Sync,
    {
        futures::stream::try_unfold(self, |mut cursor| async move {
            Ok(cursor.next_batch().await?.map(|ids| (ids, cursor)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemorySource, test_metadata};
    use futures::TryStreamExt;
    use serde_json::json;

    fn ids(raw: &[i64]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::new).collect()
    }

    #[tokio::test]
    async fn pages_ascending_until_exhausted() {
        let metadata = test_metadata().with_batch_size(2);
        let source = MemorySource::new();
        for id in [1, 2, 3, 4, 5] {
            source.insert_row(EntityId::new(id), json!({"entity_id": id})).await;
        }

        let mut cursor = ChangeLogCursor::new(&source, &metadata);

        assert_eq!(cursor.next_batch().await.unwrap(), Some(ids(&[1, 2])));
        assert_eq!(cursor.next_batch().await.unwrap(), Some(ids(&[3, 4])));
        assert_eq!(cursor.next_batch().await.unwrap(), Some(ids(&[5])));
        assert_eq!(cursor.next_batch().await.unwrap(), None);
        // Exhaustion is sticky.
        assert_eq!(cursor.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn restarts_from_a_persisted_position() {
        let metadata = test_metadata().with_batch_size(2);
        let source = MemorySource::new();
        for id in [1, 2, 3, 4] {
            source.insert_row(EntityId::new(id), json!({"entity_id": id})).await;
        }

        let mut cursor =
            ChangeLogCursor::from_position(&source, &metadata, Some(EntityId::new(2)));

        assert_eq!(cursor.next_batch().await.unwrap(), Some(ids(&[3, 4])));
        assert_eq!(cursor.position(), Some(EntityId::new(4)));
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        let metadata = test_metadata();
        let source = MemorySource::new();

        let mut cursor = ChangeLogCursor::new(&source, &metadata);
        assert_eq!(cursor.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_adapter_yields_the_same_pages() {
        let metadata = test_metadata().with_batch_size(2);
        let source = MemorySource::new();
        for id in [1, 2, 3] {
            source.insert_row(EntityId::new(id), json!({"entity_id": id})).await;
        }

        let pages: Vec<Vec<EntityId>> = ChangeLogCursor::new(&source, &metadata)
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages, vec![ids(&[1, 2]), ids(&[3])]);
    }
}
