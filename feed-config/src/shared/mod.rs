mod base;
mod batch;
mod connection;
mod feed;
mod indexer;

pub use base::*;
pub use batch::*;
pub use connection::*;
pub use feed::*;
pub use indexer::*;
