//! Module node: one served url and its cached state.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::resolver::ModuleMeta;
use crate::url::is_direct_css_request;

/// Stable handle to a node in a [`ModuleGraph`](crate::ModuleGraph).
///
/// Handles are arena indices. They stay valid for the lifetime of the graph
/// that issued them since nodes are never removed during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Insertion-ordered set of node handles.
pub type NodeSet = IndexSet<NodeId, FxBuildHasher>;

/// Whether a node is served as script or as a raw stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Script,
    Style,
}

impl ModuleKind {
    /// Kind of a url: `Style` only for direct stylesheet requests.
    pub fn from_url(url: &str) -> Self {
        if is_direct_css_request(url) {
            ModuleKind::Style
        } else {
            ModuleKind::Script
        }
    }
}

/// Compiled output cached on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<Vec<String>>,
}

impl TransformResult {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
            etag: None,
            deps: None,
        }
    }
}

/// Module info recorded by the plugin pipeline after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub meta: ModuleMeta,
}

/// An evaluated server-side module (its exports object).
pub type SsrModule = Arc<serde_json::Map<String, serde_json::Value>>;

/// Graph vertex for one canonical url.
///
/// Edge sets hold handles, never nodes, so the graph stays the only owner.
/// Nodes are handed out as snapshots; all mutation goes through the graph.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// Handle of this node
    pub id: NodeId,
    /// Canonical public path
    pub url: String,
    /// Resolver identifier, `None` until resolved
    pub resolved_id: Option<String>,
    /// Resolver identifier without query or hash
    pub file: Option<String>,
    pub kind: ModuleKind,
    /// Nodes importing this node
    pub importers: NodeSet,
    /// Nodes this node imports
    pub imports: NodeSet,
    /// Imports whose updates this node accepts
    pub accepted_hmr_deps: NodeSet,
    pub is_self_accepting: bool,
    pub info: Option<ModuleInfo>,
    pub transform_result: Option<TransformResult>,
    pub ssr_transform_result: Option<TransformResult>,
    pub ssr_module_instance: Option<SsrModule>,
    /// Milliseconds of the last HMR update touching this node
    pub last_hmr_timestamp: u64,
    pub metadata: ModuleMeta,
}

impl ModuleNode {
    pub(crate) fn new(id: NodeId, url: String) -> Self {
        let kind = ModuleKind::from_url(&url);
        Self {
            id,
            url,
            resolved_id: None,
            file: None,
            kind,
            importers: NodeSet::default(),
            imports: NodeSet::default(),
            accepted_hmr_deps: NodeSet::default(),
            is_self_accepting: false,
            info: None,
            transform_result: None,
            ssr_transform_result: None,
            ssr_module_instance: None,
            last_hmr_timestamp: 0,
            metadata: ModuleMeta::new(),
        }
    }

    pub fn is_style(&self) -> bool {
        self.kind == ModuleKind::Style
    }

    /// Whether this node accepts hot updates from `dep`.
    pub fn accepts(&self, dep: NodeId) -> bool {
        self.accepted_hmr_deps.contains(&dep)
    }

    /// Transform result for the client or the server graph.
    pub fn transform_result_for(&self, ssr: bool) -> Option<&TransformResult> {
        if ssr {
            self.ssr_transform_result.as_ref()
        } else {
            self.transform_result.as_ref()
        }
    }

    /// Drop compiled output and module info.
    pub(crate) fn clear_transform_caches(&mut self) {
        self.info = None;
        self.transform_result = None;
        self.ssr_transform_result = None;
    }
}
