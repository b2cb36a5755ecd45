use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Table layout of a single feed.
///
/// Describes where changed entities are read from and where the materialized
/// feed rows are written. Table names may be schema-qualified
/// (`catalog.price_feed`); unqualified names land in `public`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedConfig {
    /// Name of the feed, used as the prefix of feed row identities.
    pub name: String,
    /// Source table holding the authoritative entity rows.
    pub source_table: String,
    /// Key column of the source table.
    pub source_table_field: String,
    /// Feed table the materialized rows are written to.
    pub feed_table: String,
    /// Entity key column of the feed table.
    pub feed_table_field: String,
    /// Identity column of the feed table.
    #[serde(default = "default_feed_identity")]
    pub feed_identity: String,
    /// Feed table columns rewritten on upsert conflict; all other columns are
    /// preserved.
    #[serde(default = "default_mutable_columns")]
    pub mutable_columns: Vec<String>,
    /// Parent/child relation tables for composite feeds.
    #[serde(default)]
    pub relations: Option<RelationsConfig>,
}

/// Relation tables for composite (parent-child) feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RelationsConfig {
    /// Table linking parent entities to child entities.
    pub table: String,
    /// Parent key column of the relations table.
    pub parent_field: String,
    /// Child key column of the relations table.
    pub child_field: String,
    /// Parent key column of the feed table.
    pub feed_parent_field: String,
    /// Child key column of the feed table.
    pub feed_child_field: String,
}

impl FeedConfig {
    /// Validates the feed table layout.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("feed.name", &self.name),
            ("feed.source_table", &self.source_table),
            ("feed.source_table_field", &self.source_table_field),
            ("feed.feed_table", &self.feed_table),
            ("feed.feed_table_field", &self.feed_table_field),
            ("feed.feed_identity", &self.feed_identity),
        ];

        for (field, value) in required {
            if value.is_empty() {
                return Err(ValidationError::invalid(field, "must not be empty"));
            }
        }

        if self.mutable_columns.is_empty() {
            return Err(ValidationError::invalid(
                "feed.mutable_columns",
                "must name at least one column",
            ));
        }

        Ok(())
    }
}

fn default_feed_identity() -> String {
    "id".to_owned()
}

fn default_mutable_columns() -> Vec<String> {
    vec!["payload".to_owned(), "is_deleted".to_owned()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeedConfig {
        FeedConfig {
            name: "product_prices".to_owned(),
            source_table: "catalog.prices".to_owned(),
            source_table_field: "entity_id".to_owned(),
            feed_table: "catalog.price_feed".to_owned(),
            feed_table_field: "entity_id".to_owned(),
            feed_identity: default_feed_identity(),
            mutable_columns: default_mutable_columns(),
            relations: None,
        }
    }

    #[test]
    fn sample_layout_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_table_name_is_rejected() {
        let mut config = sample();
        config.feed_table = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_mutable_columns_are_rejected() {
        let mut config = sample();
        config.mutable_columns.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_apply_when_fields_are_omitted() {
        let config: FeedConfig = serde_json::from_value(serde_json::json!({
            "name": "product_prices",
            "source_table": "prices",
            "source_table_field": "entity_id",
            "feed_table": "price_feed",
            "feed_table_field": "entity_id",
        }))
        .unwrap();

        assert_eq!(config.feed_identity, "id");
        assert_eq!(config.mutable_columns, vec!["payload", "is_deleted"]);
        assert!(config.relations.is_none());
    }
}
