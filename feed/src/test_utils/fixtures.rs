use feed_postgres::schema::TableName;
use serde_json::{Value, json};

use crate::metadata::FeedIndexMetadata;

/// Metadata for a simple price feed used across tests.
pub fn test_metadata() -> FeedIndexMetadata {
    FeedIndexMetadata::new(
        "product_prices",
        TableName::new("catalog", "prices"),
        "entity_id",
        TableName::new("catalog", "price_feed"),
        "entity_id",
    )
}

/// Builds a well-formed raw change-log row.
pub fn change_row(entity_id: i64, kind: &str) -> Value {
    json!({"entity_id": entity_id, "kind": kind})
}

/// Builds a source payload for a price entity.
pub fn price_payload(entity_id: i64, price: f64) -> Value {
    json!({"entity_id": entity_id, "price": price, "currency": "USD"})
}
