use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::EntityId;

/// Scope events are attributed to when no website-specific scope applies.
pub const DEFAULT_SCOPE: &str = "admin";

/// Kind of state transition an export event describes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The entity appeared in the source for the first time.
    Created,
    /// An existing entity changed.
    Updated,
    /// The entity no longer exists in the source.
    Deleted,
}

impl EventType {
    /// Returns the canonical name of the event type.
    pub fn as_static_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Updated => "updated",
            EventType::Deleted => "deleted",
        }
    }
}

/// One event handed to the downstream export sink.
///
/// The engine only defines the shape; transport and delivery belong to the
/// consumer. The entity id is exported verbatim as the decimal rendering of
/// the source key; any further encoding is the consumer's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEvent {
    /// Transition this event describes.
    pub event_type: EventType,
    /// Exported identifier of the affected entity.
    pub entity_id: String,
    /// Scope the event applies to.
    pub scope: String,
    /// Entity state before the change, when the resolver knows it.
    pub before: Option<Value>,
    /// Entity state after the change, when the resolver knows it.
    pub after: Option<Value>,
}

impl ExportEvent {
    /// Builds an event without payloads, in the default scope.
    ///
    /// Delete events use this: the entity is gone, so there is no after
    /// state, and the before state is not re-fetched.
    pub fn without_payload(event_type: EventType, entity_id: EntityId) -> Self {
        Self {
            event_type,
            entity_id: entity_id.to_string(),
            scope: DEFAULT_SCOPE.to_owned(),
            before: None,
            after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_free_event_uses_default_scope() {
        let event = ExportEvent::without_payload(EventType::Deleted, EntityId::new(5));

        assert_eq!(event.event_type, EventType::Deleted);
        assert_eq!(event.entity_id, "5");
        assert_eq!(event.scope, DEFAULT_SCOPE);
        assert!(event.before.is_none());
        assert!(event.after.is_none());
    }
}
