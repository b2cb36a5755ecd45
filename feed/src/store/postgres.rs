use feed_postgres::schema::quoted_column;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{ErrorKind, FeedResult};
use crate::feed_error;
use crate::metadata::FeedIndexMetadata;
use crate::store::{FEED_IS_DELETED_COLUMN, FEED_PAYLOAD_COLUMN, FeedStore};
use crate::types::{EntityId, FeedRow};

/// Postgres-backed feed store.
///
/// Writes go straight to the feed table through a shared connection pool.
/// Chunks are single statements, so each chunk commits atomically on its own;
/// there is deliberately no transaction spanning chunks (see
/// [`FeedStore::upsert`]).
///
/// Feed table and column names come from configuration, so every identifier
/// is quoted before interpolation.
#[derive(Debug, Clone)]
pub struct PostgresFeedStore {
    pool: PgPool,
}

impl PostgresFeedStore {
    /// Creates a new store backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the `on conflict` assignment list for the mutable columns.
    fn conflict_assignments(metadata: &FeedIndexMetadata) -> String {
        metadata
            .feed_table_mutable_columns
            .iter()
            .map(|column| {
                let column = quoted_column(column);
                format!("{column} = excluded.{column}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FeedStore for PostgresFeedStore {
    async fn truncate(&self, metadata: &FeedIndexMetadata) -> FeedResult<()> {
        let query = format!(
            "truncate table {table}",
            table = metadata.feed_table.as_quoted_identifier()
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let detail = err.to_string();
                feed_error!(
                    ErrorKind::FeedQueryFailed,
                    "Failed to truncate feed table",
                    detail = detail,
                    source: err
                )
            })?;

        info!("truncated feed table {}", metadata.feed_table);

        Ok(())
    }

    async fn flag_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[EntityId],
    ) -> FeedResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        // The `is_deleted = false` guard keeps the affected-row count equal
        // to the number of rows that actually changed state, which makes the
        // operation observably idempotent.
        let query = format!(
            "update {table} set {deleted} = true where {key} = any($1) and {deleted} = false",
            table = metadata.feed_table.as_quoted_identifier(),
            key = quoted_column(&metadata.feed_table_field),
            deleted = quoted_column(FEED_IS_DELETED_COLUMN),
        );

        let raw_ids: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();
        let result = sqlx::query(&query)
            .bind(&raw_ids)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let detail = err.to_string();
                feed_error!(
                    ErrorKind::FeedQueryFailed,
                    "Failed to flag removed feed rows",
                    detail = detail,
                    source: err
                )
            })?;

        Ok(result.rows_affected())
    }

    async fn upsert_chunk(
        &self,
        metadata: &FeedIndexMetadata,
        rows: &[FeedRow],
    ) -> FeedResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let query = format!(
            "insert into {table} ({identity}, {key}, {payload}, {deleted}) \
             select * from unnest($1::text[], $2::int8[], $3::jsonb[], $4::bool[]) \
             on conflict ({identity}) do update set {assignments}",
            table = metadata.feed_table.as_quoted_identifier(),
            identity = quoted_column(&metadata.feed_identity),
            key = quoted_column(&metadata.feed_table_field),
            payload = quoted_column(FEED_PAYLOAD_COLUMN),
            deleted = quoted_column(FEED_IS_DELETED_COLUMN),
            assignments = Self::conflict_assignments(metadata),
        );

        let mut identities = Vec::with_capacity(rows.len());
        let mut keys = Vec::with_capacity(rows.len());
        let mut payloads = Vec::with_capacity(rows.len());
        let mut deleted_flags = Vec::with_capacity(rows.len());
        for row in rows {
            identities.push(row.identity.clone());
            keys.push(row.entity_id.into_inner());
            payloads.push(row.payload.clone());
            deleted_flags.push(row.is_deleted);
        }

        sqlx::query(&query)
            .bind(&identities)
            .bind(&keys)
            .bind(&payloads)
            .bind(&deleted_flags)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let detail = err.to_string();
                feed_error!(
                    ErrorKind::FeedQueryFailed,
                    "Failed to upsert feed rows",
                    detail = detail,
                    source: err
                )
            })?;

        debug!(
            "wrote a chunk of {} rows to feed table {}",
            rows.len(),
            metadata.feed_table
        );

        Ok(())
    }
}
