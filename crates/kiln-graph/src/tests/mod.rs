mod invalidation_tests;

use std::sync::Arc;

use crate::{ModuleGraph, TestResolver};

/// Graph over a fresh [`TestResolver`], returned alongside it.
fn graph_with_resolver() -> (ModuleGraph, Arc<TestResolver>) {
    let resolver = Arc::new(TestResolver::new());
    let graph = ModuleGraph::new(resolver.clone());
    (graph, resolver)
}
