//! Transformation of source rows into export-ready feed rows.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::source::SourceQuery;
use crate::types::{EntityId, FeedRow};

/// Post-processing hook applied to every feed row payload.
///
/// Modifiers run after the source query has produced the field-complete
/// payload, in registration order. Typical uses are computed fields and
/// per-deployment payload tweaks.
pub trait FeedModifier: Send + Sync {
    /// Name of the modifier, used in logs.
    fn name(&self) -> &str;

    /// Mutates the payload of one feed row.
    fn modify(&self, entity_id: EntityId, payload: &mut Value) -> FeedResult<()>;
}

/// Converts batches of entity ids into normalized feed rows.
///
/// Fetches the current source state in one batched query, wraps each row
/// with its stable feed identity, and runs the registered modifier callbacks.
/// Attributes on the skip list are restored to their pre-callback values
/// afterwards, so callbacks can never change them.
///
/// Input shape is uniform: a singleton, an explicit id list, and a full-scan
/// page all take the same path.
#[derive(Clone, Default)]
pub struct FeedProcessor {
    modifiers: Vec<Arc<dyn FeedModifier>>,
    skip_attributes: BTreeSet<String>,
}

impl FeedProcessor {
    /// Creates a processor with no modifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a modifier, appended after the ones already present.
    pub fn with_modifier(mut self, modifier: Arc<dyn FeedModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Declares attributes excluded from modifier mutation.
    pub fn with_skip_attributes(
        mut self,
        attributes: impl IntoIterator<Item = String>,
    ) -> Self {
        self.skip_attributes.extend(attributes);
        self
    }

    /// Builds the feed rows for the given entity ids.
    ///
    /// Ids without a source row are absent from the result; deletion handling
    /// happens before this step. The result order follows the source query.
    pub async fn process<Q>(
        &self,
        metadata: &FeedIndexMetadata,
        source: &Q,
        ids: &[EntityId],
    ) -> FeedResult<Vec<FeedRow>>
    where
        Q: SourceQuery + Sync,
    {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let source_rows = source.fetch_rows(metadata, ids).await?;

        debug!(
            "processing {} of {} requested entities for feed '{}'",
            source_rows.len(),
            ids.len(),
            metadata.feed_name
        );

        let mut feed_rows = Vec::with_capacity(source_rows.len());
        for source_row in source_rows {
            let mut payload = source_row.payload;
            self.apply_modifiers(source_row.entity_id, &mut payload)?;

            feed_rows.push(FeedRow::new(
                metadata.row_identity(source_row.entity_id),
                source_row.entity_id,
                payload,
            ));
        }

        Ok(feed_rows)
    }

    /// Runs all modifiers over one payload, shielding skip-listed attributes.
    fn apply_modifiers(&self, entity_id: EntityId, payload: &mut Value) -> FeedResult<()> {
        if self.modifiers.is_empty() {
            return Ok(());
        }

        let shielded: Vec<(&str, Option<Value>)> = self
            .skip_attributes
            .iter()
            .map(|attribute| (attribute.as_str(), payload.get(attribute).cloned()))
            .collect();

        for modifier in &self.modifiers {
            modifier.modify(entity_id, payload)?;
        }

        if let Some(fields) = payload.as_object_mut() {
            for (attribute, original) in shielded {
                match original {
                    Some(value) => {
                        fields.insert(attribute.to_owned(), value);
                    }
                    None => {
                        fields.remove(attribute);
                    }
                }
            }
        }

        Ok(())
    }
}

impl fmt::Debug for FeedProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .modifiers
            .iter()
            .map(|modifier| modifier.name())
            .collect();

        f.debug_struct("FeedProcessor")
            .field("modifiers", &names)
            .field("skip_attributes", &self.skip_attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemorySource, test_metadata};
    use serde_json::json;

    struct Stamp;

    impl FeedModifier for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn modify(&self, _entity_id: EntityId, payload: &mut Value) -> FeedResult<()> {
            if let Some(fields) = payload.as_object_mut() {
                fields.insert("stamped".to_owned(), json!(true));
                fields.insert("currency".to_owned(), json!("EUR"));
            }

            Ok(())
        }
    }

    #[tokio::test]
    async fn builds_rows_with_stable_identities() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        source
            .insert_row(EntityId::new(7), json!({"entity_id": 7, "price": 10}))
            .await;

        let processor = FeedProcessor::new();
        let rows = processor
            .process(&metadata, &source, &[EntityId::new(7)])
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identity, metadata.row_identity(EntityId::new(7)));
        assert!(!rows[0].is_deleted);
    }

    #[tokio::test]
    async fn missing_entities_are_absent_from_the_result() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        source
            .insert_row(EntityId::new(1), json!({"entity_id": 1}))
            .await;

        let processor = FeedProcessor::new();
        let rows = processor
            .process(&metadata, &source, &[EntityId::new(1), EntityId::new(2)])
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_id, EntityId::new(1));
    }

    #[tokio::test]
    async fn modifiers_run_but_skip_attributes_are_shielded() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        source
            .insert_row(
                EntityId::new(1),
                json!({"entity_id": 1, "currency": "USD"}),
            )
            .await;

        let processor = FeedProcessor::new()
            .with_modifier(Arc::new(Stamp))
            .with_skip_attributes(["currency".to_owned()]);

        let rows = processor
            .process(&metadata, &source, &[EntityId::new(1)])
            .await
            .unwrap();

        // The new field landed, the shielded one kept its original value.
        assert_eq!(rows[0].payload["stamped"], json!(true));
        assert_eq!(rows[0].payload["currency"], json!("USD"));
    }

    #[tokio::test]
    async fn shielded_absent_attributes_stay_absent() {
        let metadata = test_metadata();
        let source = MemorySource::new();
        source
            .insert_row(EntityId::new(1), json!({"entity_id": 1}))
            .await;

        let processor = FeedProcessor::new()
            .with_modifier(Arc::new(Stamp))
            .with_skip_attributes(["stamped".to_owned()]);

        let rows = processor
            .process(&metadata, &source, &[EntityId::new(1)])
            .await
            .unwrap();

        assert!(rows[0].payload.get("stamped").is_none());
    }
}
