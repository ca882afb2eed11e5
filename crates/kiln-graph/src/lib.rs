//! # kiln-graph
//!
//! Request-driven module graph for the kiln dev server.
//!
//! The graph records every module the dev server has served, keyed three
//! ways (canonical url, resolved id, file on disk), together with the
//! who-imports-whom edges and the cached transform results of each module.
//! When a file changes the graph clears the stale caches and sweeps SSR
//! instances up the importer chain; deciding what to push to browsers is
//! left to `kiln-hmr`.
//!
//! ## Architecture
//!
//! ```text
//!        request url                     file change
//!            │                               │
//!            ▼                               ▼
//!   ┌─────────────────┐   resolve   ┌──────────────┐
//!   │  resolve_url    │────────────▶│  Resolver    │ (injected)
//!   └────────┬────────┘             └──────────────┘
//!            ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ ModuleGraph  (Arc<RwLock<GraphInner>>)       │
//!   │   nodes: arena of ModuleNode                 │
//!   │   url → NodeId, id → NodeId, file → {NodeId} │
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! Nodes live in an arena owned by the graph. Import edges are sets of
//! [`NodeId`] handles on both ends, which keeps cyclic back-references free
//! of ownership cycles.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiln_graph::{IdentityResolver, ModuleGraph, ModuleRef};
//!
//! # async fn run() -> kiln_graph::Result<()> {
//! let graph = ModuleGraph::new(Arc::new(IdentityResolver));
//!
//! let main = graph.ensure_entry("/main.js", false).await;
//! graph
//!     .update_module_info(main, vec![ModuleRef::from("/util.js")], vec![], false, false)
//!     .await?;
//!
//! if let Some(changed) = graph.on_file_changed("/util.js") {
//!     println!("invalidated {} module(s)", changed.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! `ModuleGraph` is a cheap `Clone` handle. Structural changes take one
//! write lock; resolver calls never hold it, so a slow resolver only stalls
//! the request waiting on it.

pub mod error;
mod memory;
pub mod node;
pub mod resolver;
pub mod url;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{GraphError, Result};
pub use memory::{GraphView, ModuleGraph, ModuleRef, ResolvedUrl, SeenSet};
pub use node::{ModuleInfo, ModuleKind, ModuleNode, NodeId, NodeSet, SsrModule, TransformResult};
pub use resolver::{
    IdentityResolver, ModuleMeta, ResolveError, ResolveResult, ResolvedId, Resolver,
};

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::TestResolver;

#[cfg(test)]
mod tests;
