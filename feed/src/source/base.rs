use std::collections::BTreeSet;
use std::future::Future;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::types::{EntityId, SourceRow};

/// Query capability a concrete feed supplies to the engine.
///
/// All three operations are batched: implementations receive the whole id
/// set of the current page and must answer it in a bounded number of queries,
/// never one query per id.
///
/// Implementations should be cheap to share (`Clone` over a pooled
/// connection) since the indexer, the deletion resolver, and event resolvers
/// all hold the same source.
pub trait SourceQuery {
    /// Fetches the current denormalized rows for the given entity ids.
    ///
    /// Ids without a corresponding source row are simply absent from the
    /// result; detecting them is the caller's concern.
    fn fetch_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> impl Future<Output = FeedResult<Vec<SourceRow>>> + Send;

    /// Returns the subset of `ids` that still exist in the source table.
    ///
    /// This is the delete-check query: the deletion resolver diffs its input
    /// against the result to find entities that are gone.
    fn existing_ids(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> impl Future<Output = FeedResult<BTreeSet<EntityId>>> + Send;

    /// Returns up to `limit` source ids strictly greater than `position`, in
    /// ascending key order.
    ///
    /// Backs the change-log cursor during full reindex. `None` starts from
    /// the beginning of the table.
    fn next_ids(
        &self,
        metadata: &FeedIndexMetadata,
        position: Option<EntityId>,
        limit: usize,
    ) -> impl Future<Output = FeedResult<Vec<EntityId>>> + Send;
}
