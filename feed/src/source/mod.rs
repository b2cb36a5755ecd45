//! The per-feed source query capability.
//!
//! Concrete feeds supply the queries that read their source tables; the
//! engine only depends on the [`SourceQuery`] seam. A metadata-driven
//! Postgres implementation is provided for feeds whose source is a single
//! table.

mod base;
pub mod postgres;

pub use base::*;
