//! Tests for the build pipeline.

use super::*;
use codemap_embeddings::HashingEmbeddingModel;
use codemap_parser::{DependencyKind, ElementKind};
use tempfile::TempDir;

const CART: &str = r#"package com.shop.model;

public class Cart {
    private int items;

    public void add(int count) {
        items += count;
    }

    public int size() {
        return items;
    }
}
"#;

const ORDER_SERVICE: &str = r#"package com.shop.service;

import com.shop.model.Cart;
import java.util.List;

public class OrderService extends BaseService {
    private final Cart cart = new Cart();

    public int checkout() {
        validate();
        return 1;
    }

    private void validate() {
    }
}
"#;

const BROKEN: &str = "package com.shop.broken;\n\npublic class Broken {\n    void f( {\n}\n";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/com/shop/model/Cart.java", CART);
    write(dir.path(), "src/com/shop/service/OrderService.java", ORDER_SERVICE);
    dir
}

fn pipeline(config: PipelineConfig) -> Pipeline {
    Pipeline::new(config, Arc::new(HashingEmbeddingModel::new(64)))
}

#[test]
fn test_default_stage_order() {
    let pipeline = pipeline(PipelineConfig::default());
    assert_eq!(
        pipeline.stage_names(),
        vec!["discover", "extract", "enrich", "resolve", "embed"]
    );
}

#[test]
fn test_full_build() {
    let dir = project();
    let output = pipeline(PipelineConfig::default())
        .run(dir.path(), &CancelToken::new())
        .unwrap();

    let graph = &output.graph;
    let report = &output.report;
    assert_eq!(report.files_discovered, 2);
    assert_eq!(report.files_parsed, 2);
    assert_eq!(report.files_failed, 0);
    assert!(!report.stopped_early);
    assert_eq!(report.nodes, graph.node_count());
    assert_eq!(report.stages.len(), 5);

    // Files are visited in path order: model before service
    assert_eq!(graph.nodes()[0].key(), "com.shop.model.Cart");
    let cart = graph.node_by_key("com.shop.model.Cart").unwrap();
    assert_eq!(cart.children.len(), 3);
    assert!(cart.source_code.as_deref().unwrap().starts_with("public class Cart {"));
    assert!(cart.children.iter().all(|c| c.has_source()));

    let service = graph.node_by_key("com.shop.service.OrderService").unwrap();
    assert!(service.file_path.ends_with("OrderService.java"));
    let deps = graph.dependencies_of("com.shop.service.OrderService");

    let import = deps
        .iter()
        .find(|d| d.kind == DependencyKind::Import && d.target_node == "com.shop.model.Cart")
        .unwrap();
    assert!(import.target_file_path.ends_with("Cart.java"));

    let unresolved_import = deps
        .iter()
        .find(|d| d.target_node == "java.util.List")
        .unwrap();
    assert!(!unresolved_import.is_resolved());

    let creates = deps
        .iter()
        .find(|d| d.kind == DependencyKind::Creates)
        .unwrap();
    assert_eq!(creates.target_node, "com.shop.model.Cart");

    let extends = deps
        .iter()
        .find(|d| d.kind == DependencyKind::Extends)
        .unwrap();
    assert_eq!(extends.target_node, "BaseService");
    assert!(!extends.is_resolved());

    let calls = deps.iter().find(|d| d.kind == DependencyKind::Calls).unwrap();
    assert_eq!(calls.target_node, "com.shop.service.validate");
    assert!(calls.is_resolved());

    assert_eq!(output.embeddings.len(), graph.node_count());
    assert_eq!(report.embeddings.created, graph.node_count());
    assert!(output.embeddings.iter().all(|r| r.embedding.len() == 64));
}

#[test]
fn test_malformed_file_is_reported_not_fatal() {
    let dir = project();
    write(dir.path(), "src/com/shop/broken/Broken.java", BROKEN);

    let output = pipeline(PipelineConfig::default())
        .run(dir.path(), &CancelToken::new())
        .unwrap();

    assert_eq!(output.report.files_discovered, 3);
    assert_eq!(output.report.files_parsed, 2);
    assert_eq!(output.report.files_failed, 1);
    assert!(output.report.failures[0].path.ends_with("Broken.java"));
    assert!(
        output
            .graph
            .nodes()
            .iter()
            .all(|n| n.package_name != "com.shop.broken")
    );
}

#[test]
fn test_oversized_file_is_skipped() {
    let dir = project();
    let padding = format!("// {}\n", "x".repeat(4096));
    write(
        dir.path(),
        "src/com/shop/big/Big.java",
        &format!("package com.shop.big;\n{}class Big {{}}\n", padding.repeat(2)),
    );

    let config = PipelineConfig {
        max_file_size_kb: 4,
        ..Default::default()
    };
    let output = pipeline(config).run(dir.path(), &CancelToken::new()).unwrap();
    assert_eq!(output.report.files_failed, 1);
    assert!(output.graph.node_by_key("com.shop.big.Big").is_none());
}

#[test]
fn test_node_cap_stops_extraction_early() {
    let dir = project();
    let config = PipelineConfig {
        max_nodes: 1,
        batch_size: 1,
        ..Default::default()
    };
    let output = pipeline(config).run(dir.path(), &CancelToken::new()).unwrap();

    assert!(output.report.stopped_early);
    assert_eq!(output.report.files_parsed, 1);
    assert!(output.graph.nodes().iter().all(|n| n.package_name == "com.shop.model"));
}

#[test]
fn test_embedding_cap_applies() {
    let dir = project();
    let config = PipelineConfig {
        max_embeddings: 2,
        embedding_batch_size: 1,
        ..Default::default()
    };
    let output = pipeline(config).run(dir.path(), &CancelToken::new()).unwrap();
    assert_eq!(output.embeddings.len(), 2);
    assert!(output.report.embeddings.capped);
    assert_eq!(output.graph.count_of_kind(ElementKind::Class), 2);
}

#[test]
fn test_empty_root_builds_empty_graph() {
    let dir = TempDir::new().unwrap();
    let output = pipeline(PipelineConfig::default())
        .run(dir.path(), &CancelToken::new())
        .unwrap();
    assert!(output.graph.is_empty());
    assert!(output.embeddings.is_empty());
}

#[test]
fn test_missing_root_fails() {
    let dir = TempDir::new().unwrap();
    let err = pipeline(PipelineConfig::default())
        .run(&dir.path().join("missing"), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::RootNotFound(_)));
}

#[test]
fn test_cancelled_build_fails() {
    let dir = project();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = pipeline(PipelineConfig::default())
        .run(dir.path(), &cancel)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled { stage: "discover" }));
}

fn cancel_after_discover(
    ctx: &StageContext<'_>,
    state: BuildState,
) -> Result<BuildState, PipelineError> {
    ctx.cancel.cancel();
    Ok(state)
}

#[test]
fn test_custom_stages_and_mid_build_cancel() {
    let dir = project();
    let stages = vec![
        Stage::new("discover", discover),
        Stage::new("interrupt", cancel_after_discover),
        Stage::new("extract", extract),
    ];
    let pipeline = Pipeline::with_stages(
        PipelineConfig::default(),
        Arc::new(HashingEmbeddingModel::new(8)),
        stages,
    );

    let err = pipeline.run(dir.path(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled { stage: "extract" }));
}
