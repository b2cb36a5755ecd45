pub mod cursor;
pub mod deletion;
pub mod error;
pub mod events;
pub mod indexer;
mod macros;
pub mod metadata;
pub mod processor;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
