use crate::exclusions::should_exclude_path;
use anyhow::Result;
use codemap_parser::is_java_source;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Created(path) | FileEvent::Modified(path) | FileEvent::Deleted(path) => {
                path
            }
        }
    }
}

/// Recursive watcher reporting changes to Java sources only.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    receiver: Receiver<Result<Event, notify::Error>>,
    watched_paths: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn new() -> Result<Self> {
        let (tx, rx) = channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        Ok(Self {
            watcher,
            receiver: rx,
            watched_paths: Vec::new(),
        })
    }

    pub fn watch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Watching directory");
        self.watcher.watch(path, RecursiveMode::Recursive)?;
        self.watched_paths.push(path.to_path_buf());
        Ok(())
    }

    pub fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.watcher.unwatch(path)?;
        self.watched_paths.retain(|p| p != path);
        Ok(())
    }

    /// Drain pending events without blocking.
    pub fn poll_events(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();

        while let Ok(result) = self.receiver.try_recv() {
            match result {
                Ok(event) => {
                    debug!(?event, "File event");
                    events.extend(self.convert_event(event));
                }
                Err(e) => {
                    error!(error = %e, "Watch error");
                }
            }
        }

        events
    }

    fn convert_event(&self, event: Event) -> Vec<FileEvent> {
        use notify::EventKind;

        let mut file_events = Vec::new();

        for path in event.paths {
            if !is_java_source(&path) || path.is_dir() {
                continue;
            }

            // Exclusions apply below the watched root only; the root itself
            // may live under a hidden directory.
            if should_exclude_path(self.relative(&path)) {
                debug!(path = %path.display(), "Skipping excluded path event");
                continue;
            }

            match event.kind {
                EventKind::Create(_) => file_events.push(FileEvent::Created(path)),
                EventKind::Modify(_) => file_events.push(FileEvent::Modified(path)),
                EventKind::Remove(_) => file_events.push(FileEvent::Deleted(path)),
                _ => {}
            }
        }

        file_events
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        self.watched_paths
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
    }

    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched_paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    #[test]
    fn test_watcher_creation() {
        let watcher = FileWatcher::new();
        assert!(watcher.is_ok());
    }

    #[test]
    fn test_convert_event_keeps_java_sources_only() {
        let dir = TempDir::new().unwrap();
        let mut watcher = FileWatcher::new().unwrap();
        watcher.watch(dir.path()).unwrap();

        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(dir.path().join("src/App.java"))
            .add_path(dir.path().join("README.md"))
            .add_path(dir.path().join("target/gen/Gen.java"));

        let events = watcher.convert_event(event);
        assert_eq!(events, vec![FileEvent::Modified(dir.path().join("src/App.java"))]);
    }

    #[test]
    fn test_convert_event_kinds() {
        let dir = TempDir::new().unwrap();
        let mut watcher = FileWatcher::new().unwrap();
        watcher.watch(dir.path()).unwrap();
        let file = dir.path().join("A.java");

        let created = watcher.convert_event(
            Event::new(EventKind::Create(CreateKind::File)).add_path(file.clone()),
        );
        let removed = watcher.convert_event(
            Event::new(EventKind::Remove(RemoveKind::File)).add_path(file.clone()),
        );
        assert_eq!(created, vec![FileEvent::Created(file.clone())]);
        assert_eq!(removed[0].path(), file.as_path());
    }
}
