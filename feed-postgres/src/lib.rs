//! Shared Postgres plumbing for the feed indexing workspace.
//!
//! Holds the pieces that more than one crate needs when talking to Postgres:
//! safely quoted table identifiers and pool construction from the shared
//! connection configuration.

pub mod db;
pub mod schema;
