pub mod dependencies;
pub mod elements;
pub mod error;
pub mod language;
pub mod snippets;

/// Parser version. Bumping it invalidates persisted graph snapshots.
/// Bump when: node kinds change, extraction or edge logic changes.
pub const PARSER_VERSION: u32 = 3; // types named by an import are qualified even when not indexed

pub use dependencies::{CodeDependency, DependencyExtractor, DependencyKind};
pub use elements::{AstNode, ElementExtractor, ElementKind, Visibility};
pub use error::ExtractError;
pub use language::{JavaSupport, is_java_source};
pub use snippets::SnippetEnricher;
