use std::future::Future;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::types::{EntityId, FeedRow};

/// Payload column of a feed table.
pub const FEED_PAYLOAD_COLUMN: &str = "payload";

/// Soft-delete flag column of a feed table.
pub const FEED_IS_DELETED_COLUMN: &str = "is_deleted";

/// Persistence operations over one feed table.
///
/// Implementations must make every operation idempotent by key: the engine
/// retries failed batches by re-processing the same ids, and recovery after a
/// crash relies on re-applied writes converging to the same state.
pub trait FeedStore {
    /// Empties the feed table.
    ///
    /// Only the full-rebuild path calls this, before streaming the source
    /// from scratch. Incremental paths never truncate.
    fn truncate(&self, metadata: &FeedIndexMetadata)
    -> impl Future<Output = FeedResult<()>> + Send;

    /// Flags the feed rows for the given entity ids as deleted.
    ///
    /// Rows are retained as tombstones for downstream propagation. Ids
    /// without a feed row are ignored. Returns the number of rows that
    /// changed state, so re-running with the same ids returns zero.
    fn flag_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> impl Future<Output = FeedResult<u64>> + Send;

    /// Writes one chunk of feed rows atomically.
    ///
    /// Each row is inserted, or, when its identity already exists, the
    /// columns listed in [`FeedIndexMetadata::feed_table_mutable_columns`]
    /// are updated in place. Columns outside that list keep their stored
    /// values.
    fn upsert_chunk(
        &self,
        metadata: &FeedIndexMetadata,
        rows: &[FeedRow],
    ) -> impl Future<Output = FeedResult<()>> + Send;

    /// Writes feed rows in chunks of at most [`FeedIndexMetadata::batch_size`].
    ///
    /// Chunks bound statement size and lock duration. They are written
    /// sequentially and committed independently: a failure mid-run leaves a
    /// durable prefix behind, which is safe because chunks are idempotent by
    /// key and the failed range is simply re-processed.
    fn upsert(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<FeedRow>,
    ) -> impl Future<Output = FeedResult<()>> + Send
    where
        Self: Sync,
    {
        async move {
            for chunk in rows.chunks(metadata.batch_size) {
                self.upsert_chunk(metadata, chunk).await?;
            }

            Ok(())
        }
    }
}
