//! Construction and reset.

use std::sync::Arc;

use parking_lot::RwLock;

use super::graph::{GraphInner, ModuleGraph};
use crate::resolver::Resolver;

impl ModuleGraph {
    /// Create an empty graph resolving through `resolver`.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GraphInner::default())),
            resolver,
        }
    }

    /// Drop every node and index entry.
    ///
    /// Handles issued before the reset are dangling afterwards. Meant for
    /// server restarts, where the whole session state is discarded.
    pub fn clear(&self) {
        *self.inner.write() = GraphInner::default();
        tracing::debug!("module graph cleared");
    }
}
