use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{ErrorKind, FeedResult};
use crate::feed_error;
use crate::metadata::FeedIndexMetadata;
use crate::source::SourceQuery;
use crate::types::{EntityId, SourceRow};

/// Inner state of [`MemorySource`].
#[derive(Debug, Default)]
struct Inner {
    /// Source rows keyed by entity id.
    rows: BTreeMap<EntityId, Value>,
    /// When set, every query fails until cleared.
    fail_queries: bool,
}

/// In-memory [`SourceQuery`] implementation for tests.
///
/// Rows can be inserted and removed between indexing passes to simulate
/// source mutation, and [`MemorySource::fail_next_queries`] injects
/// data-access failures to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a source row.
    pub async fn insert_row(&self, entity_id: EntityId, payload: Value) {
        let mut inner = self.inner.lock().await;
        inner.rows.insert(entity_id, payload);
    }

    /// Removes a source row, simulating entity deletion.
    pub async fn remove_row(&self, entity_id: EntityId) {
        let mut inner = self.inner.lock().await;
        inner.rows.remove(&entity_id);
    }

    /// Makes every query fail until called again with `false`.
    pub async fn fail_next_queries(&self, fail: bool) {
        let mut inner = self.inner.lock().await;
        inner.fail_queries = fail;
    }

    fn failure() -> crate::error::FeedError {
        feed_error!(
            ErrorKind::SourceQueryFailed,
            "Injected source query failure"
        )
    }
}

impl SourceQuery for MemorySource {
    async fn fetch_rows(
        &self,
        _metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> FeedResult<Vec<SourceRow>> {
        let inner = self.inner.lock().await;
        if inner.fail_queries {
            return Err(Self::failure());
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                inner
                    .rows
                    .get(id)
                    .map(|payload| SourceRow::new(*id, payload.clone()))
            })
            .collect())
    }

    async fn existing_ids(
        &self,
        _metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> FeedResult<BTreeSet<EntityId>> {
        let inner = self.inner.lock().await;
        if inner.fail_queries {
            return Err(Self::failure());
        }

        Ok(ids
            .iter()
            .filter(|id| inner.rows.contains_key(id))
            .copied()
            .collect())
    }

    async fn next_ids(
        &self,
        _metadata: &FeedIndexMetadata,
        position: Option<EntityId>,
        limit: usize,
    ) -> FeedResult<Vec<EntityId>> {
        let inner = self.inner.lock().await;
        if inner.fail_queries {
            return Err(Self::failure());
        }

        let lower = match position {
            Some(position) => Bound::Excluded(position),
            None => Bound::Unbounded,
        };

        Ok(inner
            .rows
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, _)| *id)
            .collect())
    }
}
