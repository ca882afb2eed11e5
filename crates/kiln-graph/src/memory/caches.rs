//! Setters for the cached state the dev server fills in per request.

use super::graph::ModuleGraph;
use crate::error::Result;
use crate::node::{ModuleInfo, NodeId, SsrModule, TransformResult};

impl ModuleGraph {
    /// Store (or clear) the client or SSR transform result of `node`.
    pub fn set_transform_result(
        &self,
        node: NodeId,
        ssr: bool,
        result: Option<TransformResult>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.node_mut(node)?;
        if ssr {
            node.ssr_transform_result = result;
        } else {
            node.transform_result = result;
        }
        Ok(())
    }

    pub fn set_ssr_module(&self, node: NodeId, module: Option<SsrModule>) -> Result<()> {
        self.inner.write().node_mut(node)?.ssr_module_instance = module;
        Ok(())
    }

    pub fn set_info(&self, node: NodeId, info: Option<ModuleInfo>) -> Result<()> {
        self.inner.write().node_mut(node)?.info = info;
        Ok(())
    }

    /// Raise `last_hmr_timestamp`. Older stamps are ignored.
    pub fn set_last_hmr_timestamp(&self, node: NodeId, timestamp: u64) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.node_mut(node)?;
        node.last_hmr_timestamp = node.last_hmr_timestamp.max(timestamp);
        Ok(())
    }
}
