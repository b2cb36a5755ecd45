//! Export event production from raw change-log batches.
//!
//! A change-log batch is heterogeneous: rows of different kinds need
//! different handling. The [`EventPool`] partitions a batch by kind and
//! dispatches each partition to the [`EventResolver`] registered for it.

mod pool;
mod resolver;

pub use pool::*;
pub use resolver::*;
