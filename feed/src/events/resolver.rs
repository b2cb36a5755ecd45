use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::error::{ErrorKind, FeedResult};
use crate::feed_error;
use crate::metadata::FeedIndexMetadata;
use crate::source::SourceQuery;
use crate::types::{ChangeRecord, EntityId, EventType, ExportEvent};

/// Kind-specific strategy turning change records into export events.
///
/// Resolvers live in the [`crate::events::EventPool`] registry behind trait
/// objects, hence the boxed-future trait instead of the `impl Future` seams
/// used elsewhere.
#[async_trait]
pub trait EventResolver: Send + Sync {
    /// Resolves one partition of change records into export events.
    ///
    /// Either the whole partition resolves or the whole call fails; partial
    /// event lists are never returned.
    async fn retrieve(&self, records: &[ChangeRecord]) -> FeedResult<Vec<ExportEvent>>;
}

/// Resolver emitting delete events for entities that vanished from the source.
///
/// Checks the whole partition with one batched existence query and emits
/// exactly one event, in input order, for every entity absent from the
/// result. Entities still present are not this resolver's concern; an
/// update resolver would build created/updated events from their row
/// contents instead.
#[derive(Debug, Clone)]
pub struct DeletedEntitiesResolver<Q> {
    source: Q,
    metadata: Arc<FeedIndexMetadata>,
    event_type: EventType,
}

impl<Q> DeletedEntitiesResolver<Q>
where
    Q: SourceQuery,
{
    /// Creates a resolver emitting events of the given type.
    pub fn new(source: Q, metadata: Arc<FeedIndexMetadata>, event_type: EventType) -> Self {
        Self {
            source,
            metadata,
            event_type,
        }
    }
}

#[async_trait]
impl<Q> EventResolver for DeletedEntitiesResolver<Q>
where
    Q: SourceQuery + Send + Sync,
{
    async fn retrieve(&self, records: &[ChangeRecord]) -> FeedResult<Vec<ExportEvent>> {
        if records.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<EntityId> = records.iter().map(|record| record.entity_id).collect();

        let existing = self
            .source
            .existing_ids(&self.metadata, &ids)
            .await
            .map_err(|err| {
                // The underlying failure is logged here and deliberately not
                // forwarded: callers get an opaque kind so storage internals
                // never leak through the event surface.
                error!(
                    "failed to check source state for feed '{}': {}",
                    self.metadata.feed_name, err
                );

                feed_error!(
                    ErrorKind::UnableRetrieveData,
                    "Unable to retrieve data for export events"
                )
            })?;

        let mut seen = BTreeSet::new();
        let mut events = Vec::new();
        for record in records {
            if existing.contains(&record.entity_id) {
                continue;
            }

            // One event per entity, first occurrence wins.
            if !seen.insert(record.entity_id) {
                continue;
            }

            events.push(ExportEvent::without_payload(
                self.event_type,
                record.entity_id,
            ));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemorySource, change_row, test_metadata};
    use serde_json::json;

    fn records(ids: &[i64]) -> Vec<ChangeRecord> {
        ids.iter()
            .map(|&id| ChangeRecord::from_raw(&change_row(id, "price")).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn vanished_entities_get_one_delete_event_in_input_order() {
        let metadata = Arc::new(test_metadata());
        let source = MemorySource::new();
        source
            .insert_row(EntityId::new(2), json!({"entity_id": 2}))
            .await;

        let resolver =
            DeletedEntitiesResolver::new(source, metadata, EventType::Deleted);
        let events = resolver.retrieve(&records(&[5, 2, 3, 5])).await.unwrap();

        let ids: Vec<&str> = events.iter().map(|event| event.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["5", "3"]);
        assert!(events.iter().all(|event| event.event_type == EventType::Deleted));
    }

    #[tokio::test]
    async fn existing_entities_produce_no_events() {
        let metadata = Arc::new(test_metadata());
        let source = MemorySource::new();
        for id in [1, 2] {
            source.insert_row(EntityId::new(id), json!({"entity_id": id})).await;
        }

        let resolver =
            DeletedEntitiesResolver::new(source, metadata, EventType::Deleted);
        let events = resolver.retrieve(&records(&[1, 2])).await.unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn source_failures_surface_as_opaque_retrieval_errors() {
        let metadata = Arc::new(test_metadata());
        let source = MemorySource::new();
        source.fail_next_queries(true).await;

        let resolver =
            DeletedEntitiesResolver::new(source, metadata, EventType::Deleted);
        let err = resolver.retrieve(&records(&[1])).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnableRetrieveData);
    }
}
