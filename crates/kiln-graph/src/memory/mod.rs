//! In-memory ModuleGraph implementation.
//!
//! `ModuleGraph` methods are grouped by concern across the files below;
//! each file adds an `impl ModuleGraph` block.

mod caches;
mod construction;
mod edges;
mod entries;
mod graph;
mod invalidation;
mod queries;

pub use edges::ModuleRef;
pub use graph::{GraphView, ModuleGraph, ResolvedUrl, SeenSet};
