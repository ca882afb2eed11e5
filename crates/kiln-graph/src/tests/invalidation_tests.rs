//! Invalidation cascade tests.

use std::sync::Arc;

use super::graph_with_resolver;
use crate::{ModuleGraph, ModuleRef, NodeId, SeenSet, SsrModule, TransformResult};

fn ssr_instance() -> SsrModule {
    Arc::new(serde_json::Map::new())
}

/// Fill every cache slot of `id`.
fn warm(graph: &ModuleGraph, id: NodeId) {
    graph
        .set_transform_result(id, false, Some(TransformResult::new("client")))
        .unwrap();
    graph
        .set_transform_result(id, true, Some(TransformResult::new("server")))
        .unwrap();
    graph.set_ssr_module(id, Some(ssr_instance())).unwrap();
}

async fn link(graph: &ModuleGraph, from: NodeId, to: &[NodeId]) {
    let imports = to.iter().copied().map(ModuleRef::Node).collect();
    graph
        .update_module_info(from, imports, vec![], false, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn dependency_change_cascades_ssr_only() {
    let (graph, resolver) = graph_with_resolver();
    resolver
        .add("/main.js", "/project/main.js")
        .add("/util.js", "/project/util.js");

    let main = graph.ensure_entry("/main.js", false).await;
    graph
        .update_module_info(main, vec!["/util.js".into()], vec![], false, false)
        .await
        .unwrap();
    let util = graph.get_by_url("/util.js", false).await.unwrap();
    assert!(graph.node(util).unwrap().importers.contains(&main));

    warm(&graph, main);
    warm(&graph, util);

    let changed = graph.on_file_changed("/project/util.js").unwrap();
    assert_eq!(changed.len(), 1);

    let util_node = graph.node(util).unwrap();
    assert!(util_node.transform_result.is_none());
    assert!(util_node.ssr_transform_result.is_none());
    assert!(util_node.ssr_module_instance.is_none());

    let main_node = graph.node(main).unwrap();
    assert!(main_node.ssr_module_instance.is_none());
    assert_eq!(main_node.transform_result.unwrap().code, "client");
    assert_eq!(main_node.ssr_transform_result.unwrap().code, "server");
}

#[tokio::test]
async fn importer_transform_survives_until_invalidated_itself() {
    let (graph, _resolver) = graph_with_resolver();
    let app = graph.ensure_entry("/app.js", false).await;
    let dep = graph.ensure_entry("/dep.js", false).await;
    link(&graph, app, &[dep]).await;
    warm(&graph, app);
    warm(&graph, dep);

    graph.invalidate_module(dep);
    assert!(graph.node(app).unwrap().transform_result.is_some());

    graph.invalidate_module(app);
    assert!(graph.node(app).unwrap().transform_result.is_none());
}

#[tokio::test]
async fn cascade_terminates_on_cycles() {
    let (graph, _resolver) = graph_with_resolver();
    let a = graph.ensure_entry("/a.js", false).await;
    let b = graph.ensure_entry("/b.js", false).await;
    let c = graph.ensure_entry("/c.js", false).await;
    link(&graph, a, &[b]).await;
    link(&graph, b, &[c]).await;
    link(&graph, c, &[a]).await;
    for id in [a, b, c] {
        warm(&graph, id);
    }

    let mut seen = SeenSet::default();
    graph.invalidate(a, &mut seen);

    assert_eq!(seen.len(), 3);
    assert!(seen.contains(&a) && seen.contains(&b) && seen.contains(&c));
    for id in [a, b, c] {
        assert!(graph.node(id).unwrap().ssr_module_instance.is_none());
    }
    assert!(graph.node(a).unwrap().transform_result.is_none());
    assert!(graph.node(b).unwrap().transform_result.is_some());
    assert!(graph.node(c).unwrap().transform_result.is_some());
}

#[tokio::test]
async fn shared_seen_set_skips_visited_importers() {
    let (graph, _resolver) = graph_with_resolver();
    let root = graph.ensure_entry("/root.js", false).await;
    let left = graph.ensure_entry("/left.js", false).await;
    let right = graph.ensure_entry("/right.js", false).await;
    link(&graph, root, &[left, right]).await;

    let mut seen = SeenSet::default();
    graph.invalidate_ssr(left, &mut seen);
    graph.set_ssr_module(root, Some(ssr_instance())).unwrap();

    // root is already in `seen`, so the second sweep does not reach it again
    graph.invalidate_ssr(right, &mut seen);
    assert!(graph.node(root).unwrap().ssr_module_instance.is_some());
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn invalidate_all_clears_every_node() {
    let (graph, _resolver) = graph_with_resolver();
    let a = graph.ensure_entry("/a.js", false).await;
    let b = graph.ensure_entry("/b.js", false).await;
    let partial = graph.create_file_only_entry("/project/partial.css");
    link(&graph, a, &[b]).await;
    for id in [a, b, partial] {
        warm(&graph, id);
    }

    graph.invalidate_all();

    for id in [a, b, partial] {
        let node = graph.node(id).unwrap();
        assert!(node.transform_result.is_none());
        assert!(node.ssr_transform_result.is_none());
        assert!(node.ssr_module_instance.is_none());
    }
    assert_eq!(graph.len(), 3, "invalidation never removes nodes");
}

#[tokio::test]
async fn invalidation_keeps_indices() {
    let (graph, resolver) = graph_with_resolver();
    resolver.add("/a.js", "/project/a.js");
    let a = graph.ensure_entry("/a.js", false).await;

    graph.invalidate_module(a);

    assert_eq!(graph.get_by_url("/a.js", false).await, Some(a));
    assert_eq!(graph.get_by_id("/project/a.js"), Some(a));
    assert!(graph.get_by_file("/project/a.js").unwrap().contains(&a));
}

#[tokio::test]
async fn unknown_file_change_is_a_no_op() {
    let (graph, _resolver) = graph_with_resolver();
    graph.ensure_entry("/a.js", false).await;
    assert!(graph.on_file_changed("/nowhere.js").is_none());
}

#[tokio::test]
async fn update_invalidation_stops_at_accepting_importer() {
    let (graph, _resolver) = graph_with_resolver();
    let page = graph.ensure_entry("/page.js", false).await;
    let widget = graph.ensure_entry("/widget.js", false).await;
    let leaf = graph.ensure_entry("/leaf.js", false).await;

    link(&graph, page, &[widget]).await;
    graph
        .update_module_info(
            widget,
            vec![ModuleRef::Node(leaf)],
            vec![ModuleRef::Node(leaf)],
            false,
            false,
        )
        .await
        .unwrap();
    for id in [page, widget, leaf] {
        warm(&graph, id);
    }

    let mut seen = SeenSet::default();
    graph.invalidate_for_update(leaf, 1_700_000_000_000, &mut seen);

    let leaf_node = graph.node(leaf).unwrap();
    assert_eq!(leaf_node.last_hmr_timestamp, 1_700_000_000_000);
    assert!(leaf_node.transform_result.is_none());

    // widget accepts leaf, so the sweep stops there
    let widget_node = graph.node(widget).unwrap();
    assert!(widget_node.transform_result.is_some());
    assert_eq!(widget_node.last_hmr_timestamp, 0);
    assert!(graph.node(page).unwrap().transform_result.is_some());
}

#[tokio::test]
async fn hmr_timestamp_never_decreases() {
    let (graph, _resolver) = graph_with_resolver();
    let a = graph.ensure_entry("/a.js", false).await;

    graph.set_last_hmr_timestamp(a, 200).unwrap();
    graph.set_last_hmr_timestamp(a, 100).unwrap();
    assert_eq!(graph.node(a).unwrap().last_hmr_timestamp, 200);

    let mut seen = SeenSet::default();
    graph.invalidate_for_update(a, 150, &mut seen);
    assert_eq!(graph.node(a).unwrap().last_hmr_timestamp, 200);
}
