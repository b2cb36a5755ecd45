//! Entry points of the feed indexing engine.

use std::sync::Arc;

use tracing::info;

use crate::cursor::ChangeLogCursor;
use crate::deletion::DeletionResolver;
use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::processor::FeedProcessor;
use crate::source::SourceQuery;
use crate::store::FeedStore;
use crate::types::EntityId;

/// Materializes one feed from its source table.
///
/// [`FeedIndexer`] is the surface the scheduler triggers: a full rebuild via
/// [`FeedIndexer::execute_full`], and incremental passes via
/// [`FeedIndexer::execute`] (the canonical change-capture hook) and its
/// [`FeedIndexer::execute_list`] / [`FeedIndexer::execute_row`] variants.
///
/// Every invocation runs synchronously to completion or failure; there is no
/// persisted mid-state. A failure aborts the current batch, while chunks
/// committed by earlier batches remain. Re-invoking with the same ids is
/// the recovery mechanism, and it is safe because all writes are idempotent
/// by key.
#[derive(Debug)]
pub struct FeedIndexer<Q, S> {
    metadata: Arc<FeedIndexMetadata>,
    source: Q,
    store: S,
    processor: FeedProcessor,
}

impl<Q, S> FeedIndexer<Q, S>
where
    Q: SourceQuery + Sync,
    S: FeedStore + Sync,
{
    /// Creates an indexer for the given feed.
    ///
    /// Fails fast on invalid metadata so misconfiguration surfaces before
    /// any table is touched.
    pub fn new(metadata: FeedIndexMetadata, source: Q, store: S) -> FeedResult<Self> {
        metadata.validate()?;

        Ok(Self {
            metadata: Arc::new(metadata),
            source,
            store,
            processor: FeedProcessor::new(),
        })
    }

    /// Replaces the default (modifier-free) processor.
    pub fn with_processor(mut self, processor: FeedProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Returns the metadata of the feed this indexer materializes.
    pub fn metadata(&self) -> Arc<FeedIndexMetadata> {
        self.metadata.clone()
    }

    /// Rebuilds the feed from scratch.
    ///
    /// Truncates the feed table, then streams every source id in pages
    /// through the change-log cursor; each page goes through the same
    /// mark-removed / process / upsert path as an incremental batch. Returns
    /// the number of feed rows written.
    ///
    /// Must not run concurrently with incremental passes against the same
    /// feed: the truncate is not transactionally isolated from their
    /// upserts. Serializing the two is the responsibility of the external
    /// scheduler or locking layer invoking this engine.
    pub async fn execute_full(&self) -> FeedResult<u64> {
        info!("starting full rebuild of feed '{}'", self.metadata.feed_name);

        self.store.truncate(&self.metadata).await?;

        let mut cursor = ChangeLogCursor::new(&self.source, &self.metadata);
        let mut written = 0u64;
        while let Some(page) = cursor.next_batch().await? {
            written += self.index_batch(&page).await?;
        }

        info!(
            "full rebuild of feed '{}' wrote {} rows",
            self.metadata.feed_name, written
        );

        Ok(written)
    }

    /// Reindexes the given entities; the canonical change-capture hook.
    ///
    /// Flags vanished entities as removed, re-materializes the rest, never
    /// truncates. Returns the number of feed rows written.
    pub async fn execute(&self, ids: &[EntityId]) -> FeedResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.index_batch(ids).await
    }

    /// Reindexes an explicit list of entities.
    pub async fn execute_list(&self, ids: &[EntityId]) -> FeedResult<u64> {
        self.execute(ids).await
    }

    /// Reindexes a single entity.
    pub async fn execute_row(&self, id: EntityId) -> FeedResult<u64> {
        self.execute(&[id]).await
    }

    /// Runs one batch through mark-removed, process, and upsert.
    async fn index_batch(&self, ids: &[EntityId]) -> FeedResult<u64> {
        DeletionResolver::new(&self.source, &self.store, &self.metadata)
            .mark_removed(ids)
            .await?;

        let rows = self
            .processor
            .process(&self.metadata, &self.source, ids)
            .await?;

        let written = rows.len() as u64;
        if written > 0 {
            self.store.upsert(&self.metadata, rows).await?;
        }

        Ok(written)
    }
}
