//! Lookups. None of these create nodes.

use super::graph::{GraphView, ModuleGraph};
use crate::node::{ModuleNode, NodeId, NodeSet};
use crate::url::remove_timestamp_query;

impl ModuleGraph {
    /// Node for a raw request url, canonicalized through the resolver.
    pub async fn get_by_url(&self, raw_url: &str, ssr: bool) -> Option<NodeId> {
        let resolved = self.resolve_url(raw_url, ssr).await;
        self.inner.read().url_to_node.get(&resolved.url).copied()
    }

    /// Node for a resolved id. No resolver call.
    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        let id = remove_timestamp_query(id);
        self.inner.read().id_to_node.get(&id).copied()
    }

    /// All nodes backed by `file`.
    pub fn get_by_file(&self, file: &str) -> Option<NodeSet> {
        self.inner.read().file_to_nodes.get(file).cloned()
    }

    /// Snapshot of a node.
    pub fn node(&self, id: NodeId) -> Option<ModuleNode> {
        self.inner.read().nodes.get(id.index()).cloned()
    }

    /// Run `f` against a consistent read-only view of the whole graph.
    ///
    /// The read lock is held for the duration of `f`; do not call back into
    /// mutating graph methods from inside it.
    pub fn view<R>(&self, f: impl FnOnce(GraphView<'_>) -> R) -> R {
        let inner = self.inner.read();
        f(GraphView { inner: &inner })
    }

    /// Handles of every node in creation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.inner.read().nodes.iter().map(|node| node.id).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }
}
