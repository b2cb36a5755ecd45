//! Static description of a feed: table layout, key columns, batch sizing.

use feed_config::shared::{BatchConfig, FeedConfig};
use feed_postgres::schema::TableName;

use crate::error::{ErrorKind, FeedResult};
use crate::feed_error;
use crate::types::EntityId;

/// Immutable configuration of one feed.
///
/// Owned by the indexer entry point; constructed once per feed type and never
/// mutated afterwards. Everything the engine knows about a feed lives here:
/// which source table to watch, which feed table to write, and which columns
/// may be rewritten on conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedIndexMetadata {
    /// Name of the feed, used as the prefix of feed row identities.
    pub feed_name: String,
    /// Source table holding the authoritative entity rows.
    pub source_table: TableName,
    /// Key column of the source table.
    pub source_table_field: String,
    /// Identity column of the feed table.
    pub feed_identity: String,
    /// Feed table the materialized rows are written to.
    pub feed_table: TableName,
    /// Entity key column of the feed table.
    pub feed_table_field: String,
    /// Columns rewritten when an upsert hits an existing identity. Columns
    /// not listed here keep their stored values.
    pub feed_table_mutable_columns: Vec<String>,
    /// Maximum entities per cursor page and rows per upsert chunk.
    pub batch_size: usize,
    /// Parent/child relation layout for composite feeds.
    pub relations: Option<RelationsMetadata>,
}

/// Relation-table layout for composite (parent-child) feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationsMetadata {
    /// Parent key column of the feed table.
    pub feed_table_parent_field: String,
    /// Child key column of the feed table.
    pub feed_table_child_field: String,
    /// Table linking parents to children.
    pub relations_table: TableName,
    /// Parent key column of the relations table.
    pub relations_table_parent_field: String,
    /// Child key column of the relations table.
    pub relations_table_child_field: String,
}

impl FeedIndexMetadata {
    /// Creates metadata with the default batch size and no relations.
    pub fn new(
        feed_name: impl Into<String>,
        source_table: TableName,
        source_table_field: impl Into<String>,
        feed_table: TableName,
        feed_table_field: impl Into<String>,
    ) -> Self {
        Self {
            feed_name: feed_name.into(),
            source_table,
            source_table_field: source_table_field.into(),
            feed_identity: "id".to_owned(),
            feed_table,
            feed_table_field: feed_table_field.into(),
            feed_table_mutable_columns: vec!["payload".to_owned(), "is_deleted".to_owned()],
            batch_size: BatchConfig::DEFAULT_MAX_SIZE,
            relations: None,
        }
    }

    /// Builds metadata from the deployment configuration surface.
    pub fn from_config(feed: &FeedConfig, batch: &BatchConfig) -> Self {
        let relations = feed.relations.as_ref().map(|relations| RelationsMetadata {
            feed_table_parent_field: relations.feed_parent_field.clone(),
            feed_table_child_field: relations.feed_child_field.clone(),
            relations_table: TableName::from_qualified(&relations.table),
            relations_table_parent_field: relations.parent_field.clone(),
            relations_table_child_field: relations.child_field.clone(),
        });

        Self {
            feed_name: feed.name.clone(),
            source_table: TableName::from_qualified(&feed.source_table),
            source_table_field: feed.source_table_field.clone(),
            feed_identity: feed.feed_identity.clone(),
            feed_table: TableName::from_qualified(&feed.feed_table),
            feed_table_field: feed.feed_table_field.clone(),
            feed_table_mutable_columns: feed.mutable_columns.clone(),
            batch_size: batch.max_size,
            relations,
        }
    }

    /// Overrides the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Attaches relation-table layout for a composite feed.
    pub fn with_relations(mut self, relations: RelationsMetadata) -> Self {
        self.relations = Some(relations);
        self
    }

    /// Returns the stable feed row identity for an entity.
    ///
    /// Entity keys are unique within the source table, so prefixing with the
    /// feed name keeps identities unique per feed and stable across passes.
    pub fn row_identity(&self, entity_id: EntityId) -> String {
        format!("{}-{}", self.feed_name, entity_id)
    }

    /// Validates the metadata.
    ///
    /// Entry points call this once at construction so that a misconfigured
    /// feed fails before touching any table.
    pub fn validate(&self) -> FeedResult<()> {
        let required = [
            ("feed_name", self.feed_name.as_str()),
            ("source_table_field", self.source_table_field.as_str()),
            ("feed_identity", self.feed_identity.as_str()),
            ("feed_table_field", self.feed_table_field.as_str()),
        ];

        for (field, value) in required {
            if value.is_empty() {
                bail_empty(field)?;
            }
        }

        if self.feed_table_mutable_columns.is_empty() {
            bail_empty("feed_table_mutable_columns")?;
        }

        if self.batch_size == 0 {
            return Err(feed_error!(
                ErrorKind::ConfigError,
                "Feed metadata batch size is zero"
            ));
        }

        Ok(())
    }
}

fn bail_empty(field: &str) -> FeedResult<()> {
    Err(feed_error!(
        ErrorKind::ConfigError,
        "Feed metadata field is empty",
        detail = format!("field `{field}` must not be empty")
    ))
}
