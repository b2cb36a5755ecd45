//! Persistence over the feed table.
//!
//! The engine writes through the [`FeedStore`] seam: truncation for full
//! rebuilds, soft-delete flagging, and chunked upserts. A Postgres
//! implementation backs production; the memory implementation backs tests
//! and development.

mod base;
pub mod memory;
pub mod postgres;

pub use base::*;
