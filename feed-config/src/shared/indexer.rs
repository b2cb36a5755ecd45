use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{BatchConfig, FeedConfig, PgConnectionConfig, ValidationError};

/// Root configuration of the indexer service binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IndexerConfig {
    /// Connection to the database holding both source and feed tables.
    pub source: PgConnectionConfig,
    /// Batch sizing for pages and upsert chunks.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Table layout of the feed being indexed.
    pub feed: FeedConfig,
    /// Which indexing mode to run.
    #[serde(default)]
    pub mode: IndexerMode,
}

/// Indexing mode requested for one invocation of the binary.
///
/// Incremental triggers arrive with an explicit id list; everything else is a
/// full rebuild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexerMode {
    /// Truncate the feed table and rebuild it from scratch.
    #[default]
    Full,
    /// Reindex only the given entity ids.
    Ids(Vec<i64>),
}

impl IndexerConfig {
    /// Validates the whole configuration tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.tls.validate()?;
        self.batch.validate()?;
        self.feed.validate()?;

        if let IndexerMode::Ids(ids) = &self.mode
            && ids.is_empty()
        {
            return Err(ValidationError::invalid(
                "mode.ids",
                "must name at least one entity id",
            ));
        }

        Ok(())
    }
}

impl Config for IndexerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["feed.mutable_columns"];
}
