//! Staged build of a graph snapshot from a project root.
//!
//! A build runs an ordered list of stages over a [`BuildState`]:
//! discover, extract, enrich, resolve, embed. Each stage takes the state by
//! value and hands it to the next. Per-file and per-element problems are
//! recorded in the [`BuildReport`] and never abort the build; only a bad
//! root, a missing grammar or cancellation do.

use crate::config::PipelineConfig;
use crate::embedding::{EmbeddingPipeline, EmbeddingStats};
use crate::error::PipelineError;
use crate::graph::DependencyGraph;
use crate::locator::SourceLocator;
use crate::progress::PercentProgress;
use crate::resolver::{CrossFileResolver, ResolutionStats};
use crate::schema::EmbeddingRecord;
use codemap_embeddings::EmbeddingModel;
use codemap_parser::{DependencyExtractor, ElementExtractor, ExtractError, SnippetEnricher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Shared cancellation flag, checked between stages and between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self, stage: &'static str) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub name: String,
    pub millis: u64,
}

/// What a build did, including everything it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub root: String,
    pub files_discovered: usize,
    pub files_parsed: usize,
    pub files_failed: usize,
    pub failures: Vec<FileFailure>,
    /// Extraction stopped before all files were read because of the node cap
    pub stopped_early: bool,
    pub nodes: usize,
    pub edges: usize,
    pub key_collisions: usize,
    pub snippets: usize,
    pub resolution: ResolutionStats,
    pub embeddings: EmbeddingStats,
    pub stages: Vec<StageTiming>,
    pub duration_ms: u64,
    /// Unix seconds at completion
    pub built_at: i64,
}

impl BuildReport {
    fn record_failure(&mut self, path: &Path, error: &ExtractError) {
        self.files_failed += 1;
        self.failures.push(FileFailure {
            path: path.to_string_lossy().to_string(),
            reason: error.to_string(),
        });
    }
}

/// The graph under construction, passed from stage to stage.
#[derive(Debug, Default)]
pub struct BuildState {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    /// Files that produced a tree, as recorded in node file paths
    pub parsed_files: Vec<String>,
    pub graph: DependencyGraph,
    pub embeddings: Vec<EmbeddingRecord>,
    pub report: BuildReport,
}

impl BuildState {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            report: BuildReport {
                root: root.to_string_lossy().to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Everything a stage may read besides the state itself.
pub struct StageContext<'a> {
    pub config: &'a PipelineConfig,
    pub model: &'a dyn EmbeddingModel,
    pub cancel: &'a CancelToken,
}

pub type StageFn = fn(&StageContext<'_>, BuildState) -> Result<BuildState, PipelineError>;

#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub run: StageFn,
}

impl Stage {
    pub const fn new(name: &'static str, run: StageFn) -> Self {
        Self { name, run }
    }
}

/// Finished build, ready to be published.
#[derive(Debug)]
pub struct BuildOutput {
    pub graph: DependencyGraph,
    pub embeddings: Vec<EmbeddingRecord>,
    pub report: BuildReport,
}

pub struct Pipeline {
    config: PipelineConfig,
    model: Arc<dyn EmbeddingModel>,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, model: Arc<dyn EmbeddingModel>) -> Self {
        Self::with_stages(config, model, Self::default_stages())
    }

    pub fn with_stages(
        config: PipelineConfig,
        model: Arc<dyn EmbeddingModel>,
        stages: Vec<Stage>,
    ) -> Self {
        Self {
            config,
            model,
            stages,
        }
    }

    pub fn default_stages() -> Vec<Stage> {
        vec![
            Stage::new("discover", discover),
            Stage::new("extract", extract),
            Stage::new("enrich", enrich),
            Stage::new("resolve", resolve),
            Stage::new("embed", embed),
        ]
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn EmbeddingModel> {
        &self.model
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    pub fn run(&self, root: &Path, cancel: &CancelToken) -> Result<BuildOutput, PipelineError> {
        let start = Instant::now();
        let ctx = StageContext {
            config: &self.config,
            model: self.model.as_ref(),
            cancel,
        };

        info!(root = %root.display(), "Building graph");
        let mut state = BuildState::new(root);
        for stage in &self.stages {
            cancel.check(stage.name)?;
            let stage_start = Instant::now();
            state = (stage.run)(&ctx, state)?;

            let millis = stage_start.elapsed().as_millis() as u64;
            debug!(stage = stage.name, millis, "Stage finished");
            state.report.stages.push(StageTiming {
                name: stage.name.to_string(),
                millis,
            });
        }

        let mut report = state.report;
        report.nodes = state.graph.node_count();
        report.edges = state.graph.edge_count();
        report.key_collisions = state.graph.collisions();
        report.duration_ms = start.elapsed().as_millis() as u64;
        report.built_at = unix_now();

        info!(
            files = report.files_parsed,
            failed = report.files_failed,
            nodes = report.nodes,
            edges = report.edges,
            embeddings = state.embeddings.len(),
            millis = report.duration_ms,
            "Graph built"
        );

        Ok(BuildOutput {
            graph: state.graph,
            embeddings: state.embeddings,
            report,
        })
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn discover(_ctx: &StageContext<'_>, mut state: BuildState) -> Result<BuildState, PipelineError> {
    state.files = SourceLocator::discover(&state.root)?;
    state.report.files_discovered = state.files.len();
    info!(files = state.files.len(), "Discovered Java sources");
    Ok(state)
}

fn extract(ctx: &StageContext<'_>, mut state: BuildState) -> Result<BuildState, PipelineError> {
    let mut extractor =
        ElementExtractor::new(ctx.config.max_file_size_kb).map_err(PipelineError::Grammar)?;
    let files = std::mem::take(&mut state.files);
    let mut progress = PercentProgress::new(files.len(), ctx.config.progress_interval);

    'batches: for batch in files.chunks(ctx.config.batch_size.max(1)) {
        ctx.cancel.check("extract")?;

        for path in batch {
            if state.graph.node_count() >= ctx.config.max_nodes {
                state.report.stopped_early = true;
                warn!(
                    max_nodes = ctx.config.max_nodes,
                    read = progress.done(),
                    total = files.len(),
                    "Node limit reached, remaining files skipped"
                );
                break 'batches;
            }

            match extractor.parse_file(path) {
                Ok(parsed) => {
                    let edges =
                        DependencyExtractor::extract(&parsed.tree, &parsed.source, &parsed.elements);
                    for element in parsed.elements {
                        state.graph.add_node(element);
                    }
                    for edge in edges {
                        state.graph.add_dependency(edge);
                    }
                    state.parsed_files.push(parsed.path);
                    state.report.files_parsed += 1;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping file");
                    state.report.record_failure(path, &e);
                }
            }

            if let Some(percent) = progress.advance(1) {
                info!(
                    percent,
                    files = progress.done(),
                    total = progress.total(),
                    nodes = state.graph.node_count(),
                    "Extraction progress"
                );
            }
        }
    }

    state.files = files;
    Ok(state)
}

fn enrich(ctx: &StageContext<'_>, mut state: BuildState) -> Result<BuildState, PipelineError> {
    for batch in state.parsed_files.chunks(ctx.config.batch_size.max(1)) {
        ctx.cancel.check("enrich")?;

        for path in batch {
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!(file = %path, error = %e, "Could not re-read file for snippets");
                    continue;
                }
            };
            state.report.snippets +=
                SnippetEnricher::enrich(state.graph.nodes_in_file_mut(path), &source);
        }
    }

    debug!(snippets = state.report.snippets, "Attached source snippets");
    Ok(state)
}

fn resolve(_ctx: &StageContext<'_>, mut state: BuildState) -> Result<BuildState, PipelineError> {
    let stats = CrossFileResolver::resolve(&mut state.graph);
    info!(
        resolved = stats.resolved(),
        unresolved = stats.unresolved,
        "Resolved cross-file references"
    );
    state.report.resolution = stats;
    Ok(state)
}

fn embed(ctx: &StageContext<'_>, mut state: BuildState) -> Result<BuildState, PipelineError> {
    let outcome = EmbeddingPipeline::new(ctx.model, ctx.config).run(&state.graph, ctx.cancel)?;
    state.embeddings = outcome.records;
    state.report.embeddings = outcome.stats;
    Ok(state)
}

#[cfg(test)]
mod tests;
