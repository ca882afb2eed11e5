//! Error types for graph operations.
//!
//! Lookups on the graph never fail: a missing entry is `None`. Resolver
//! failures are absorbed by canonicalization. The only error left is handing
//! the graph a node handle it never issued.

use crate::node::NodeId;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors produced by the module graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A node handle that does not belong to this graph.
    #[error("Module node {0} not found in graph")]
    NodeNotFound(NodeId),
}
