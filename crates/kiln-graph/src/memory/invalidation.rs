//! Cache invalidation cascades.
//!
//! Every cascade runs to completion under one write lock and is guarded by
//! an explicit [`SeenSet`], so cycles terminate and no node is visited twice
//! within one sweep.

use tracing::debug;

use super::graph::{GraphInner, ModuleGraph, SeenSet};
use crate::node::{NodeId, NodeSet};

impl GraphInner {
    fn invalidate(&mut self, id: NodeId, seen: &mut SeenSet) {
        let Some(node) = self.nodes.get_mut(id.index()) else {
            return;
        };
        node.clear_transform_caches();
        self.invalidate_ssr(id, seen);
    }

    /// Drop the evaluated SSR instance of `id` and of every transitive
    /// importer. Importers keep their client transform results.
    fn invalidate_ssr(&mut self, id: NodeId, seen: &mut SeenSet) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(current.index()) else {
                continue;
            };
            node.ssr_module_instance = None;
            stack.extend(node.importers.iter().copied());
        }
    }

    fn invalidate_for_update(&mut self, id: NodeId, timestamp: u64, seen: &mut SeenSet) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(current.index()) else {
                continue;
            };
            node.last_hmr_timestamp = node.last_hmr_timestamp.max(timestamp);
            node.transform_result = None;
            node.ssr_transform_result = None;
            node.ssr_module_instance = None;

            let importers: Vec<NodeId> = node.importers.iter().copied().collect();
            for importer in importers {
                if !self.nodes[importer.index()].accepts(current) {
                    stack.push(importer);
                }
            }
        }
    }
}

impl ModuleGraph {
    /// Clear the module info and both transform results of `node`, then
    /// drop SSR instances up its importer chain.
    ///
    /// Pass the same `seen` set to several calls to share one sweep.
    pub fn invalidate(&self, node: NodeId, seen: &mut SeenSet) {
        self.inner.write().invalidate(node, seen);
    }

    /// [`invalidate`](Self::invalidate) with a fresh visited set.
    pub fn invalidate_module(&self, node: NodeId) {
        let mut seen = SeenSet::default();
        self.invalidate(node, &mut seen);
    }

    /// Drop the SSR instance of `node` and all transitive importers.
    pub fn invalidate_ssr(&self, node: NodeId, seen: &mut SeenSet) {
        self.inner.write().invalidate_ssr(node, seen);
    }

    /// Invalidate every node in one sweep.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.write();
        let mut seen = SeenSet::default();
        for index in 0..inner.nodes.len() {
            inner.invalidate(NodeId::new(index), &mut seen);
        }
        debug!(count = inner.nodes.len(), "invalidated all modules");
    }

    /// Invalidate every node backed by `file`.
    ///
    /// Returns the affected nodes, or `None` if the file is not in the
    /// graph. No debouncing happens here.
    pub fn on_file_changed(&self, file: &str) -> Option<NodeSet> {
        let mut inner = self.inner.write();
        let nodes = inner.file_to_nodes.get(file)?.clone();
        let mut seen = SeenSet::default();
        for &id in &nodes {
            inner.invalidate(id, &mut seen);
        }
        debug!(file = %file, modules = nodes.len(), "file changed");
        Some(nodes)
    }

    /// Invalidation for a hot update at `timestamp`.
    ///
    /// Stamps `last_hmr_timestamp` and clears every cached result of `node`,
    /// then continues into importers that do not accept updates from the
    /// node they were reached through.
    pub fn invalidate_for_update(&self, node: NodeId, timestamp: u64, seen: &mut SeenSet) {
        self.inner.write().invalidate_for_update(node, timestamp, seen);
    }
}
