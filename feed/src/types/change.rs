use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, FeedResult};
use crate::feed_error;

/// Field of a raw change-log row holding the entity key.
pub const ENTITY_ID_FIELD: &str = "entity_id";

/// Field of a raw change-log row holding the change kind tag.
pub const KIND_FIELD: &str = "kind";

/// Field of a raw change-log row holding the change-log sequence id.
pub const VERSION_ID_FIELD: &str = "version_id";

/// Type-safe wrapper for source entity keys.
///
/// Entity keys are totally ordered; the change-log cursor relies on ascending
/// key comparison for restartable paging.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Creates a new [`EntityId`] from the raw key value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw key value.
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One parsed entry of the change log.
///
/// Raw change-log rows are loosely typed maps; [`ChangeRecord::from_raw`]
/// turns them into this shape or reports what is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Key of the changed source entity.
    pub entity_id: EntityId,
    /// Kind tag used to pick the resolver responsible for this change.
    pub kind: String,
    /// Change-log sequence id the row was recorded under, when present.
    pub version_id: Option<i64>,
}

impl ChangeRecord {
    /// Parses a raw change-log row.
    ///
    /// Requires [`ENTITY_ID_FIELD`] (integer, or a string holding one) and a
    /// non-empty [`KIND_FIELD`]. Everything else is optional.
    pub fn from_raw(raw: &Value) -> FeedResult<ChangeRecord> {
        let entity_id = match raw.get(ENTITY_ID_FIELD) {
            Some(value) => parse_entity_id(value).ok_or_else(|| {
                feed_error!(
                    ErrorKind::MalformedRecord,
                    "Change-log row has a non-integer entity id",
                    detail = raw.to_string()
                )
            })?,
            None => {
                return Err(feed_error!(
                    ErrorKind::MalformedRecord,
                    "Change-log row is missing the entity id",
                    detail = raw.to_string()
                ));
            }
        };

        let kind = match raw.get(KIND_FIELD).and_then(Value::as_str) {
            Some(kind) if !kind.is_empty() => kind.to_owned(),
            _ => {
                return Err(feed_error!(
                    ErrorKind::MalformedRecord,
                    "Change-log row is missing the kind tag",
                    detail = raw.to_string()
                ));
            }
        };

        let version_id = raw.get(VERSION_ID_FIELD).and_then(Value::as_i64);

        Ok(ChangeRecord {
            entity_id,
            kind,
            version_id,
        })
    }
}

/// Reads an entity id from a JSON integer or a string holding one.
///
/// Change-log rows sourced from trigger-maintained tables often carry keys as
/// strings, so both representations are accepted.
fn parse_entity_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(number) => number.as_i64().map(EntityId::new),
        Value::String(text) => text.parse::<i64>().ok().map(EntityId::new),
        _ => None,
    }
}
