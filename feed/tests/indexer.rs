use feed::error::ErrorKind;
use feed::indexer::FeedIndexer;
use feed::metadata::FeedIndexMetadata;
use feed::store::memory::MemoryFeedStore;
use feed::test_utils::{MemorySource, price_payload, test_metadata};
use feed::types::EntityId;
use feed_telemetry::tracing::init_test_tracing;

fn ids(raw: impl IntoIterator<Item = i64>) -> Vec<EntityId> {
    raw.into_iter().map(EntityId::new).collect()
}

async fn seed_source(source: &MemorySource, raw_ids: impl IntoIterator<Item = i64>) {
    for id in raw_ids {
        source
            .insert_row(EntityId::new(id), price_payload(id, id as f64 * 10.0))
            .await;
    }
}

fn indexer(
    metadata: FeedIndexMetadata,
    source: &MemorySource,
    store: &MemoryFeedStore,
) -> FeedIndexer<MemorySource, MemoryFeedStore> {
    FeedIndexer::new(metadata, source.clone(), store.clone()).unwrap()
}

#[tokio::test]
async fn full_rebuild_materializes_every_source_row() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, 1..=5).await;

    let indexer = indexer(test_metadata().with_batch_size(2), &source, &store);
    let written = indexer.execute_full().await.unwrap();

    assert_eq!(written, 5);
    assert_eq!(store.truncate_count().await, 1);

    let rows = store.rows().await;
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| !row.is_deleted));
    assert_eq!(rows[0].identity, "product_prices-1");
}

#[tokio::test]
async fn incremental_pass_updates_only_the_given_entities() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, 1..=3).await;

    let indexer = indexer(test_metadata(), &source, &store);
    indexer.execute_full().await.unwrap();

    // Entity 2 changes at the source; only it gets re-materialized.
    source
        .insert_row(EntityId::new(2), price_payload(2, 99.0))
        .await;
    let written = indexer.execute(&ids([2])).await.unwrap();

    assert_eq!(written, 1);
    let row = store.row(EntityId::new(2)).await.unwrap();
    assert_eq!(row.payload["price"], serde_json::json!(99.0));
    // Untouched entities keep their previous payloads.
    let row = store.row(EntityId::new(1)).await.unwrap();
    assert_eq!(row.payload["price"], serde_json::json!(10.0));
}

#[tokio::test]
async fn incremental_pass_flags_vanished_entities() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, 1..=3).await;

    let indexer = indexer(test_metadata(), &source, &store);
    indexer.execute_full().await.unwrap();

    source.remove_row(EntityId::new(3)).await;
    indexer.execute(&ids([1, 2, 3])).await.unwrap();

    let row = store.row(EntityId::new(3)).await.unwrap();
    assert!(row.is_deleted, "vanished entity must be tombstoned");
    assert!(!store.row(EntityId::new(1)).await.unwrap().is_deleted);
    assert!(!store.row(EntityId::new(2)).await.unwrap().is_deleted);
}

#[tokio::test]
async fn full_then_list_on_a_subset_is_idempotent() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, 1..=4).await;

    let indexer = indexer(test_metadata(), &source, &store);
    indexer.execute_full().await.unwrap();
    let after_full = store.rows().await;

    // No source mutation in between: reindexing a subset must not change
    // the table.
    indexer.execute_list(&ids([2, 3])).await.unwrap();
    assert_eq!(store.rows().await, after_full);
}

#[tokio::test]
async fn single_row_trigger_behaves_like_a_list_of_one() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, [7]).await;

    let indexer = indexer(test_metadata(), &source, &store);
    let written = indexer.execute_row(EntityId::new(7)).await.unwrap();

    assert_eq!(written, 1);
    assert_eq!(
        store.row(EntityId::new(7)).await.unwrap().identity,
        "product_prices-7"
    );
}

#[tokio::test]
async fn large_batches_are_written_in_bounded_chunks() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, 1..=250).await;

    let indexer = indexer(test_metadata().with_batch_size(100), &source, &store);
    let written = indexer.execute(&ids(1..=250)).await.unwrap();

    assert_eq!(written, 250);
    assert_eq!(store.upsert_chunk_sizes().await, vec![100, 100, 50]);
}

#[tokio::test]
async fn empty_trigger_is_a_no_op() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();

    let indexer = indexer(test_metadata(), &source, &store);
    assert_eq!(indexer.execute(&[]).await.unwrap(), 0);
    assert!(store.rows().await.is_empty());
}

#[tokio::test]
async fn source_failure_aborts_the_batch_without_writes() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();
    seed_source(&source, 1..=3).await;

    let indexer = indexer(test_metadata(), &source, &store);
    source.fail_next_queries(true).await;

    let err = indexer.execute(&ids([1, 2, 3])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
    assert!(store.rows().await.is_empty(), "no partial batch may land");

    // The same ids succeed once the source recovers.
    source.fail_next_queries(false).await;
    assert_eq!(indexer.execute(&ids([1, 2, 3])).await.unwrap(), 3);
}

#[tokio::test]
async fn invalid_metadata_is_rejected_at_construction() {
    init_test_tracing();

    let source = MemorySource::new();
    let store = MemoryFeedStore::new();

    let err = FeedIndexer::new(
        test_metadata().with_batch_size(0),
        source,
        store,
    )
    .map(|_| ())
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigError);
}
