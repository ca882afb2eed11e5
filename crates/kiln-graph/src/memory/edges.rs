//! Import edge reconciliation.

use tracing::debug;

use super::graph::ModuleGraph;
use crate::error::{GraphError, Result};
use crate::node::{NodeId, NodeSet};

/// A dependency given either as a raw url or as an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleRef {
    Url(String),
    Node(NodeId),
}

impl From<&str> for ModuleRef {
    fn from(url: &str) -> Self {
        ModuleRef::Url(url.to_string())
    }
}

impl From<String> for ModuleRef {
    fn from(url: String) -> Self {
        ModuleRef::Url(url)
    }
}

impl From<NodeId> for ModuleRef {
    fn from(id: NodeId) -> Self {
        ModuleRef::Node(id)
    }
}

impl ModuleGraph {
    /// Replace the import edges of `node` with a freshly analyzed list.
    ///
    /// Url references are resolved one at a time in input order, so the
    /// resulting edge order never depends on resolver timing. Edges are
    /// then swapped in under one write lock: back-edges are added for every
    /// import and removed from imports that disappeared. `accepted` replaces
    /// the accepted set wholesale; entries that are not also imports are
    /// dropped.
    ///
    /// Returns the dropped imports that are left with no importer at all,
    /// or `None` when nothing was orphaned.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if `node` or a [`ModuleRef::Node`] is not
    /// a handle of this graph. Handles are checked before any url is
    /// resolved, so no entry is created in that case.
    pub async fn update_module_info(
        &self,
        node: NodeId,
        imported: Vec<ModuleRef>,
        accepted: Vec<ModuleRef>,
        is_self_accepting: bool,
        ssr: bool,
    ) -> Result<Option<NodeSet>> {
        {
            let inner = self.inner.read();
            inner.node(node)?;
            if let Some(missing) = imported
                .iter()
                .chain(accepted.iter())
                .find_map(|module_ref| match module_ref {
                    ModuleRef::Node(id) if !inner.contains(*id) => Some(*id),
                    _ => None,
                })
            {
                return Err(GraphError::NodeNotFound(missing));
            }
        }

        let next_imports = self.resolve_refs(imported, ssr).await;
        let mut next_accepted = self.resolve_refs(accepted, ssr).await;
        next_accepted.retain(|id| next_imports.contains(id));

        let mut inner = self.inner.write();
        // A concurrent clear can invalidate handles while urls resolve
        inner.node(node)?;
        if let Some(&missing) = next_imports.iter().find(|id| !inner.contains(**id)) {
            return Err(GraphError::NodeNotFound(missing));
        }

        let prev_imports = std::mem::take(&mut inner.nodes[node.index()].imports);

        for dep in &next_imports {
            inner.nodes[dep.index()].importers.insert(node);
        }

        let mut orphaned: Option<NodeSet> = None;
        for dep in prev_imports {
            if next_imports.contains(&dep) {
                continue;
            }
            let dep_node = &mut inner.nodes[dep.index()];
            dep_node.importers.shift_remove(&node);
            if dep_node.importers.is_empty() {
                orphaned.get_or_insert_with(NodeSet::default).insert(dep);
            }
        }

        let target = &mut inner.nodes[node.index()];
        target.imports = next_imports;
        target.accepted_hmr_deps = next_accepted;
        target.is_self_accepting = is_self_accepting;

        if let Some(orphans) = &orphaned {
            debug!(url = %target.url, count = orphans.len(), "imports no longer referenced");
        }

        Ok(orphaned)
    }

    async fn resolve_refs(&self, refs: Vec<ModuleRef>, ssr: bool) -> NodeSet {
        let mut ids = NodeSet::default();
        for module_ref in refs {
            let id = match module_ref {
                ModuleRef::Url(url) => self.ensure_entry(&url, ssr).await,
                ModuleRef::Node(id) => id,
            };
            ids.insert(id);
        }
        ids
    }
}
