use feed::indexer::FeedIndexer;
use feed::metadata::FeedIndexMetadata;
use feed::source::postgres::PostgresSource;
use feed::store::postgres::PostgresFeedStore;
use feed::types::EntityId;
use feed_config::load_config;
use feed_config::shared::{IndexerConfig, IndexerMode};
use feed_postgres::db::connect_to_database;
use feed_telemetry::tracing::init_tracing;
use tracing::info;

/// The engine runs batches sequentially, so one connection is enough.
const NUM_POOL_CONNECTIONS: u32 = 1;

/// Loads configuration, wires the engine, and runs the configured mode.
///
/// Scheduling is external: whatever invokes this binary is responsible for
/// serializing full rebuilds against incremental runs of the same feed.
pub async fn start_indexer() -> anyhow::Result<()> {
    init_tracing("feed-indexer");

    let config: IndexerConfig = load_config()?;
    config.validate()?;

    let metadata = FeedIndexMetadata::from_config(&config.feed, &config.batch);

    let pool =
        connect_to_database(&config.source, NUM_POOL_CONNECTIONS, NUM_POOL_CONNECTIONS).await?;
    let source = PostgresSource::new(pool.clone());
    let store = PostgresFeedStore::new(pool);

    let indexer = FeedIndexer::new(metadata, source, store)?;

    let written = match &config.mode {
        IndexerMode::Full => indexer.execute_full().await?,
        IndexerMode::Ids(ids) => {
            let ids: Vec<EntityId> = ids.iter().copied().map(EntityId::new).collect();
            indexer.execute(&ids).await?
        }
    };

    info!(
        "indexing run for feed '{}' finished, {} rows written",
        config.feed.name, written
    );

    Ok(())
}
