use crate::error::PipelineError;
use crate::graph_store::RebuildOutcome;
use crate::indexer::Indexer;
use crate::pipeline::CancelToken;
use crate::watcher::{FileEvent, FileWatcher};
use anyhow::{Result, anyhow};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Rebuilds the index whenever Java sources under the project root change.
///
/// Changes are coalesced: however many events arrive between two polls,
/// they trigger a single full rebuild.
pub struct AutoIndexer {
    indexer: Arc<Indexer>,
    watcher: Mutex<FileWatcher>,
    cancel: CancelToken,
}

impl AutoIndexer {
    pub fn new(indexer: Arc<Indexer>) -> Result<Self> {
        let mut watcher = FileWatcher::new()?;
        watcher.watch(indexer.root())?;

        info!(root = %indexer.root().display(), "AutoIndexer initialized");

        Ok(Self {
            indexer,
            watcher: Mutex::new(watcher),
            cancel: CancelToken::new(),
        })
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    /// Token that aborts any running rebuild. Once cancelled, later rebuilds
    /// fail immediately too.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn initial_index(&self) -> Result<RebuildOutcome, PipelineError> {
        self.indexer.rebuild(&self.cancel)
    }

    /// Poll pending file events and rebuild once if any Java source changed.
    pub fn process_events(&self) -> Result<ProcessResult> {
        let events = {
            let watcher = self
                .watcher
                .lock()
                .map_err(|e| anyhow!("Watcher lock poisoned: {}", e))?;
            watcher.poll_events()
        };

        if events.is_empty() {
            return Ok(ProcessResult::default());
        }

        let mut result = ProcessResult::default();
        for event in &events {
            debug!(path = %event.path().display(), "Source changed");
            match event {
                FileEvent::Created(_) => result.created += 1,
                FileEvent::Modified(_) => result.modified += 1,
                FileEvent::Deleted(_) => result.deleted += 1,
            }
        }

        match self.indexer.rebuild(&self.cancel) {
            Ok(outcome) => {
                result.rebuilt = !outcome.joined;
                result.generation = outcome.snapshot.generation;
                info!(
                    created = result.created,
                    modified = result.modified,
                    deleted = result.deleted,
                    generation = result.generation,
                    "Auto-indexed changes"
                );
            }
            Err(e) => {
                // The previous snapshot stays published; the next change retries.
                warn!(error = %e, "Rebuild after file changes failed");
                result.failed = true;
            }
        }

        Ok(result)
    }
}

#[derive(Default, Debug)]
pub struct ProcessResult {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    pub rebuilt: bool,
    pub failed: bool,
    pub generation: u64,
}

impl ProcessResult {
    pub fn changed(&self) -> usize {
        self.created + self.modified + self.deleted
    }
}
