//! Directories that never hold sources worth indexing.
//!
//! Build outputs, IDE state and VCS metadata are pruned during discovery and
//! ignored by the watcher.

use std::path::{Component, Path};

/// Directories to exclude from indexing
pub const EXCLUDED_DIRS: &[&str] = &[
    "target",
    "build",
    "out",
    "bin",
    "classes",
    "generated-sources",
    "node_modules",
    ".gradle",
    ".mvn",
    ".idea",
    ".settings",
    ".git",
    ".hg",
    ".svn",
];

/// Check if a path should be excluded from indexing
///
/// Returns true if any component is hidden (starts with '.') or matches an
/// excluded directory name.
pub fn should_exclude_path(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
        }
        _ => false,
    })
}

/// Check if a directory entry name should be excluded (for WalkBuilder filter)
pub fn should_exclude_entry(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}
