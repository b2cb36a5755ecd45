use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::FeedResult;
use crate::events::EventResolver;
use crate::types::{ChangeRecord, ExportEvent};

/// Registry dispatching change-log batches to kind-specific resolvers.
///
/// A batch is partitioned by kind tag; each partition goes to the resolver
/// registered for that kind. Malformed rows and rows of unregistered kinds
/// are skipped with a warning: one bad row must not stall the rest of the
/// batch, and an unrelated kind appearing in the shared change log is not
/// this pool's failure.
#[derive(Default)]
pub struct EventPool {
    resolvers: HashMap<String, Arc<dyn EventResolver>>,
}

impl EventPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver for a change kind, replacing any previous one.
    pub fn with_resolver(
        mut self,
        kind: impl Into<String>,
        resolver: Arc<dyn EventResolver>,
    ) -> Self {
        self.resolvers.insert(kind.into(), resolver);
        self
    }

    /// Resolves a batch of raw change-log rows into export events.
    ///
    /// Event order is insertion order within each kind partition; partitions
    /// appear in first-seen kind order. A resolver failure fails the whole
    /// call, so no partial event list is ever returned.
    pub async fn retrieve(&self, raw_rows: &[Value]) -> FeedResult<Vec<ExportEvent>> {
        let mut kind_order: Vec<String> = Vec::new();
        let mut partitions: HashMap<String, Vec<ChangeRecord>> = HashMap::new();

        for raw in raw_rows {
            let record = match ChangeRecord::from_raw(raw) {
                Ok(record) => record,
                Err(err) => {
                    warn!("skipping malformed change-log row: {}", err);
                    continue;
                }
            };

            let partition = partitions.entry(record.kind.clone()).or_insert_with(|| {
                kind_order.push(record.kind.clone());
                Vec::new()
            });
            partition.push(record);
        }

        let mut events = Vec::new();
        for kind in kind_order {
            let records = partitions
                .remove(&kind)
                .expect("partition exists for every tracked kind");

            match self.resolvers.get(&kind) {
                Some(resolver) => {
                    events.extend(resolver.retrieve(&records).await?);
                }
                None => {
                    warn!(
                        "no resolver registered for change kind '{}', skipping {} records",
                        kind,
                        records.len()
                    );
                }
            }
        }

        Ok(events)
    }
}

impl fmt::Debug for EventPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        kinds.sort_unstable();

        f.debug_struct("EventPool").field("kinds", &kinds).finish()
    }
}
