use crate::error::PipelineError;
use crate::exclusions::should_exclude_entry;
use codemap_parser::is_java_source;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Finds the Java sources under a project root.
pub struct SourceLocator;

impl SourceLocator {
    /// Every `.java` file below `root`, sorted by path so that builds see
    /// files in a stable order.
    pub fn discover(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::RootNotFound(root.to_path_buf()));
            }
            Err(source) => {
                return Err(PipelineError::RootUnreadable {
                    path: root.to_path_buf(),
                    source,
                });
            }
        };
        if !metadata.is_dir() {
            return Err(PipelineError::NotADirectory(root.to_path_buf()));
        }
        fs::read_dir(root).map_err(|source| PipelineError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !should_exclude_entry(&name)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file()) && is_java_source(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        debug!(root = %root.display(), files = files.len(), "Discovered sources");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    #[test]
    fn test_discover_java_files_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/b/B.java");
        touch(dir.path(), "src/a/A.java");
        touch(dir.path(), "src/a/notes.txt");
        touch(dir.path(), "target/generated/Gen.java");
        touch(dir.path(), ".idea/Workspace.java");

        let files = SourceLocator::discover(dir.path()).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["src/a/A.java", "src/b/B.java"]);
    }

    #[test]
    fn test_empty_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(SourceLocator::discover(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = SourceLocator::discover(&missing).unwrap_err();
        assert!(matches!(err, PipelineError::RootNotFound(_)));
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.java");
        let err = SourceLocator::discover(&dir.path().join("A.java")).unwrap_err();
        assert!(matches!(err, PipelineError::NotADirectory(_)));
    }
}
