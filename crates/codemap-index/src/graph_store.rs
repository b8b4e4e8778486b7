//! The published graph snapshot and the single-flight rebuild around it.
//!
//! Readers take an `Arc` to the current snapshot and keep using it for as
//! long as they like. A rebuild constructs a complete new snapshot off to the
//! side and swaps it in only if every stage succeeded, so readers never see a
//! partial graph and a failed rebuild leaves the previous one in place.
//!
//! At most one rebuild runs at a time. A trigger that arrives while another
//! rebuild is in flight waits for it and then shares its result instead of
//! starting a second one.

use crate::error::PipelineError;
use crate::graph::DependencyGraph;
use crate::pipeline::{BuildOutput, BuildReport};
use crate::schema::EmbeddingRecord;
use codemap_parser::AstNode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// An immutable, fully built index. Generations count up from whatever the
/// store started with; a fresh store starts empty at 0.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    pub graph: DependencyGraph,
    pub embeddings: Vec<EmbeddingRecord>,
    pub report: Option<BuildReport>,
    pub generation: u64,
}

impl IndexSnapshot {
    pub fn from_build(output: BuildOutput, generation: u64) -> Self {
        Self {
            graph: output.graph,
            embeddings: output.embeddings,
            report: Some(output.report),
            generation,
        }
    }

    /// First stored embedding for `node_key`.
    pub fn embedding_for(&self, node_key: &str) -> Option<&EmbeddingRecord> {
        self.embeddings.iter().find(|r| r.node_key == node_key)
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RebuildOutcome {
    pub snapshot: Arc<IndexSnapshot>,
    /// True when this call waited on another in-flight rebuild and returned
    /// its result rather than building.
    pub joined: bool,
}

pub struct GraphStore {
    current: RwLock<Arc<IndexSnapshot>>,
    rebuild_lock: Mutex<()>,
    generation: AtomicU64,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_snapshot(IndexSnapshot::default())
    }

    /// Start from an already built snapshot, e.g. one loaded from disk.
    pub fn with_snapshot(snapshot: IndexSnapshot) -> Self {
        let generation = snapshot.generation;
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            rebuild_lock: Mutex::new(()),
            generation: AtomicU64::new(generation),
        }
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>, PipelineError> {
        self.current
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| PipelineError::LockPoisoned)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Node lookup against the current snapshot.
    pub fn node(&self, key: &str) -> Result<Option<AstNode>, PipelineError> {
        Ok(self.snapshot()?.graph.node_by_key(key).cloned())
    }

    /// Run `build` under the single-flight lock and publish its result.
    ///
    /// `build` receives the generation number the new snapshot will carry.
    /// If another rebuild published while this call was waiting for the
    /// lock, `build` is not called and that result is returned instead. If
    /// `build` fails nothing is published and the next trigger builds again.
    pub fn rebuild_with<F>(&self, build: F) -> Result<RebuildOutcome, PipelineError>
    where
        F: FnOnce(u64) -> Result<IndexSnapshot, PipelineError>,
    {
        let observed = self.generation();
        let _guard = self
            .rebuild_lock
            .lock()
            .map_err(|_| PipelineError::LockPoisoned)?;

        if self.generation() != observed {
            debug!(observed, current = self.generation(), "Joined in-flight rebuild");
            return Ok(RebuildOutcome {
                snapshot: self.snapshot()?,
                joined: true,
            });
        }

        let next = observed + 1;
        let mut snapshot = build(next)?;
        snapshot.generation = next;
        let snapshot = Arc::new(snapshot);

        {
            let mut current = self
                .current
                .write()
                .map_err(|_| PipelineError::LockPoisoned)?;
            *current = Arc::clone(&snapshot);
        }
        self.generation.store(next, Ordering::SeqCst);

        info!(
            generation = next,
            nodes = snapshot.graph.node_count(),
            embeddings = snapshot.embeddings.len(),
            "Published graph snapshot"
        );

        Ok(RebuildOutcome {
            snapshot,
            joined: false,
        })
    }
}
