//! Url canonicalization and node creation.

use tracing::debug;

use super::graph::{ModuleGraph, ResolvedUrl};
use crate::node::NodeId;
use crate::url::{
    clean_url, extname, fs_url, normalize_path, remove_import_query, remove_timestamp_query,
    split_url,
};

impl ModuleGraph {
    /// Canonicalize a raw request url.
    ///
    /// Strips the HMR timestamp and the `import` marker, resolves the rest,
    /// and appends the resolved file extension to an extension-less pathname
    /// so `/src/app` and `/src/app.css` land on the same node. A resolver miss
    /// or failure falls back to the cleaned url as its own id.
    pub async fn resolve_url(&self, raw_url: &str, ssr: bool) -> ResolvedUrl {
        let url = remove_import_query(&remove_timestamp_query(raw_url));

        let resolved = match self.resolver.resolve(&url, ssr).await {
            Ok(resolved) => resolved.filter(|r| !r.id.is_empty()),
            Err(err) => {
                debug!(url = %url, error = %err, "resolution failed, using url as id");
                None
            }
        };

        let (resolved_id, meta) = match resolved {
            Some(resolved) => (resolved.id, resolved.meta),
            None => (url.clone(), None),
        };

        let url = match extname(clean_url(&resolved_id)) {
            Some(ext) => {
                let parts = split_url(&url);
                if parts.pathname.ends_with(ext) {
                    url.clone()
                } else {
                    format!("{}{}{}{}", parts.pathname, ext, parts.search, parts.hash)
                }
            }
            None => url,
        };

        ResolvedUrl {
            url,
            resolved_id,
            meta,
        }
    }

    /// Node for `raw_url`, created and indexed on first request.
    ///
    /// Resolution runs without the lock. The url index is re-checked under
    /// the write lock, so concurrent calls for the same url share one node.
    pub async fn ensure_entry(&self, raw_url: &str, ssr: bool) -> NodeId {
        let ResolvedUrl {
            url,
            resolved_id,
            meta,
        } = self.resolve_url(raw_url, ssr).await;

        let mut inner = self.inner.write();
        if let Some(&id) = inner.url_to_node.get(&url) {
            return id;
        }

        let file = clean_url(&resolved_id).to_string();
        let id = inner.push_node(url.clone());
        let node = &mut inner.nodes[id.index()];
        node.resolved_id = Some(resolved_id.clone());
        node.file = Some(file.clone());
        if let Some(meta) = meta {
            node.metadata = meta;
        }

        debug!(url = %url, id = %resolved_id, "module entry created");

        inner.url_to_node.insert(url, id);
        inner.id_to_node.insert(resolved_id, id);
        inner.register_file(file, id);
        id
    }

    /// Node for a file that is only ever inlined into another module, such
    /// as a stylesheet pulled in through `@import`.
    ///
    /// The node gets an `/@fs/` url and is indexed by file only. Calling this
    /// again for the same file returns the same node, as does a file whose
    /// regular entry was resolved to exactly that path.
    pub fn create_file_only_entry(&self, file: &str) -> NodeId {
        let file = normalize_path(file);
        let url = fs_url(&file);

        let mut inner = self.inner.write();
        if let Some(existing) = inner.file_to_nodes.get(&file) {
            let found = existing.iter().copied().find(|id| {
                let node = &inner.nodes[id.index()];
                node.url == url || node.resolved_id.as_deref() == Some(file.as_str())
            });
            if let Some(id) = found {
                return id;
            }
        }

        let id = inner.push_node(url);
        inner.nodes[id.index()].file = Some(file.clone());
        debug!(file = %file, "file-only module entry created");
        inner.register_file(file, id);
        id
    }
}
