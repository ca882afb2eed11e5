use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::error::{GraphError, Result};
use crate::node::{ModuleNode, NodeId, NodeSet};
use crate::resolver::{ModuleMeta, Resolver};

/// Visited set threaded through invalidation cascades.
pub type SeenSet = HashSet<NodeId>;

/// Canonical identity of a requested url.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUrl {
    /// Canonical public url, used as the url index key
    pub url: String,
    /// Resolver identifier, or the cleaned url when resolution missed
    pub resolved_id: String,
    pub meta: Option<ModuleMeta>,
}

/// Request-driven module graph of a dev server session.
///
/// Cloning is cheap and every clone shares the same state. Structural
/// mutation (index insertion, edge changes, invalidation) happens under one
/// write lock; the resolver is always called with no lock held.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub(super) inner: Arc<RwLock<GraphInner>>,
    pub(super) resolver: Arc<dyn Resolver>,
}

#[derive(Debug, Default)]
pub(super) struct GraphInner {
    /// Node arena, indexed by `NodeId`
    pub(super) nodes: Vec<ModuleNode>,
    /// Canonical url -> node
    pub(super) url_to_node: HashMap<String, NodeId>,
    /// Resolved id -> node
    pub(super) id_to_node: HashMap<String, NodeId>,
    /// Clean file path -> nodes (one file, many queries)
    pub(super) file_to_nodes: HashMap<String, NodeSet>,
}

impl GraphInner {
    pub(super) fn node(&self, id: NodeId) -> Result<&ModuleNode> {
        self.nodes.get(id.index()).ok_or(GraphError::NodeNotFound(id))
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Result<&mut ModuleNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub(super) fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Allocate a node for `url`. Index registration is up to the caller.
    pub(super) fn push_node(&mut self, url: String) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(ModuleNode::new(id, url));
        id
    }

    pub(super) fn register_file(&mut self, file: String, id: NodeId) {
        self.file_to_nodes.entry(file).or_default().insert(id);
    }
}

/// Read-only view of the graph under a single read lock.
///
/// Used by traversals that must see one consistent state, such as HMR
/// boundary propagation.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    pub(super) inner: &'a GraphInner,
}

impl<'a> GraphView<'a> {
    /// Node for a handle.
    pub fn node(&self, id: NodeId) -> Option<&'a ModuleNode> {
        self.inner.nodes.get(id.index())
    }

    /// Node registered under an already canonical url.
    pub fn node_by_url(&self, url: &str) -> Option<&'a ModuleNode> {
        self.inner
            .url_to_node
            .get(url)
            .and_then(|id| self.node(*id))
    }

    /// Nodes registered for a file.
    pub fn nodes_by_file(&self, file: &str) -> Option<&'a NodeSet> {
        self.inner.file_to_nodes.get(file)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &'a ModuleNode> + 'a {
        self.inner.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }
}
