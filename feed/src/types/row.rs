use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::EntityId;

/// A denormalized row fetched from the source by the per-feed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Key of the source entity this row describes.
    pub entity_id: EntityId,
    /// Export-ready field map for the entity.
    pub payload: Value,
}

impl SourceRow {
    /// Creates a new [`SourceRow`].
    pub fn new(entity_id: EntityId, payload: Value) -> Self {
        Self { entity_id, payload }
    }
}

/// A materialized record of the feed table.
///
/// The identity is unique and stable across indexing passes; re-processing an
/// entity updates the row in place. Rows are never physically removed by the
/// incremental paths; disappearing entities are flagged deleted so
/// downstream consumers can propagate tombstones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRow {
    /// Stable identity of the row within the feed.
    pub identity: String,
    /// Key of the source entity the row materializes.
    pub entity_id: EntityId,
    /// Serialized export payload.
    pub payload: Value,
    /// Whether the source entity has disappeared.
    pub is_deleted: bool,
}

impl FeedRow {
    /// Creates a live (non-deleted) feed row.
    pub fn new(identity: String, entity_id: EntityId, payload: Value) -> Self {
        Self {
            identity,
            entity_id,
            payload,
            is_deleted: false,
        }
    }
}
