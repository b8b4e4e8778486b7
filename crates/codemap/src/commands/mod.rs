//! CLI command implementations for codemap

pub mod common;
mod explain;
mod index;
mod query;
mod search;
mod stats;
mod watch;

pub use explain::explain;
pub use index::index;
pub use query::{query, query_request};
pub use search::{search, similar};
pub use stats::stats;
pub use watch::watch;
