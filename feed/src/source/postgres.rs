use std::collections::BTreeSet;

use feed_postgres::schema::quoted_column;
use sqlx::PgPool;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::source::SourceQuery;
use crate::types::{EntityId, SourceRow};

/// Metadata-driven [`SourceQuery`] over a single Postgres source table.
///
/// Exports every column of the source row as the payload via `to_jsonb`.
/// Feeds that need joins or computed fields implement [`SourceQuery`]
/// themselves; this covers the common single-table case.
///
/// Table and column names come from configuration, so every identifier is
/// quoted before interpolation.
#[derive(Debug, Clone)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Creates a new source backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SourceQuery for PostgresSource {
    async fn fetch_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> FeedResult<Vec<SourceRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            "select {key} as entity_id, to_jsonb(t) as payload from {table} t where {key} = any($1)",
            key = quoted_column(&metadata.source_table_field),
            table = metadata.source_table.as_quoted_identifier(),
        );

        let raw_ids: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, (i64, serde_json::Value)>(&query)
            .bind(&raw_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(entity_id, payload)| SourceRow::new(EntityId::new(entity_id), payload))
            .collect())
    }

    async fn existing_ids(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> FeedResult<BTreeSet<EntityId>> {
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let query = format!(
            "select {key} from {table} where {key} = any($1)",
            key = quoted_column(&metadata.source_table_field),
            table = metadata.source_table.as_quoted_identifier(),
        );

        let raw_ids: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, (i64,)>(&query)
            .bind(&raw_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| EntityId::new(id)).collect())
    }

    async fn next_ids(
        &self,
        metadata: &FeedIndexMetadata,
        position: Option<EntityId>,
        limit: usize,
    ) -> FeedResult<Vec<EntityId>> {
        let key = quoted_column(&metadata.source_table_field);
        let table = metadata.source_table.as_quoted_identifier();

        let rows = match position {
            Some(position) => {
                let query = format!(
                    "select {key} from {table} where {key} > $1 order by {key} asc limit $2"
                );

                sqlx::query_as::<_, (i64,)>(&query)
                    .bind(position.into_inner())
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!("select {key} from {table} order by {key} asc limit $1");

                sqlx::query_as::<_, (i64,)>(&query)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|(id,)| EntityId::new(id)).collect())
    }
}
