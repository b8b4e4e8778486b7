pub mod engine;
pub mod error;
pub mod format;
pub mod query;
pub mod results;

pub use engine::{DEFAULT_EXPLAIN_DEPTH, RetrievalEngine};
pub use error::RetrievalError;
pub use query::{CodeQueryRequest, QueryMode};
pub use results::{CallTreeNode, QueryResult, ScoredRecord, SourceContext};
