//! HMR engine: turns file changes into update payloads.
//!
//! ```text
//! file change ─▶ graph invalidation ─▶ boundary propagation ─▶ channel
//!                                          │
//!                                          └─ dead end ─▶ full-reload
//! ```

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use kiln_graph::url::{is_css_request, normalize_path};
use kiln_graph::{GraphView, ModuleGraph, NodeId, NodeSet, SeenSet};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::channel::HmrChannel;
use crate::error::Result;
use crate::payload::{ErrorPayload, HmrPayload, Update};
use crate::watcher::FileChange;

/// A module that accepts an update, and the module it accepted it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub boundary: NodeId,
    pub accepted_via: NodeId,
}

/// Outcome of propagating an update from one changed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    /// Every path reached an accepting module
    Boundaries(Vec<Boundary>),
    /// Some path reached a module nothing accepts; the page must reload
    DeadEnd,
}

/// Connects the module graph to the update channel.
#[derive(Debug, Clone)]
pub struct HmrEngine {
    graph: ModuleGraph,
    channel: HmrChannel,
    /// Normalized project root
    root: String,
}

impl HmrEngine {
    pub fn new(graph: ModuleGraph, channel: HmrChannel, root: impl Into<PathBuf>) -> Self {
        let root = normalize_path(&root.into().to_string_lossy());
        Self {
            graph,
            channel,
            root,
        }
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub fn channel(&self) -> &HmrChannel {
        &self.channel
    }

    /// React to a modified file.
    ///
    /// Modules built from the file are invalidated and hot-updated. An html
    /// file nothing imports reloads the pages that show it.
    pub fn handle_file_change(&self, file: &Path) -> Result<()> {
        let file = normalize_path(&file.to_string_lossy());

        if let Some(nodes) = self.graph.on_file_changed(&file) {
            return self.update_modules(&self.short_name(&file), &nodes, now_millis());
        }

        if file.ends_with(".html") {
            if let Some(path) = self.root_relative(&file) {
                info!(path = %path, "page reload");
                return self.channel.send(&HmrPayload::FullReload { path: Some(path) });
            }
        }

        debug!(file = %file, "no modules matched");
        Ok(())
    }

    /// React to a created or removed file. Only modules already tracked for
    /// the path are updated.
    pub fn handle_file_add_unlink(&self, file: &Path) -> Result<()> {
        let file = normalize_path(&file.to_string_lossy());
        match self.graph.get_by_file(&file) {
            Some(nodes) if !nodes.is_empty() => {
                self.update_modules(&self.short_name(&file), &nodes, now_millis())
            }
            _ => Ok(()),
        }
    }

    /// Invalidate `nodes` for an update stamped `timestamp` and push the
    /// result: one `update` listing every boundary, or a single
    /// `full-reload` if any module hit a dead end.
    pub fn update_modules(&self, file: &str, nodes: &NodeSet, timestamp: u64) -> Result<()> {
        let mut updates = Vec::new();
        let mut invalidated = SeenSet::default();
        let mut need_full_reload = false;

        for &node in nodes {
            self.graph
                .invalidate_for_update(node, timestamp, &mut invalidated);
            if need_full_reload {
                continue;
            }

            match self.propagate_update(node) {
                Propagation::DeadEnd => need_full_reload = true,
                Propagation::Boundaries(boundaries) => self.graph.view(|view| {
                    for Boundary {
                        boundary,
                        accepted_via,
                    } in boundaries
                    {
                        let (Some(boundary), Some(via)) =
                            (view.node(boundary), view.node(accepted_via))
                        else {
                            continue;
                        };
                        updates.push(Update {
                            kind: boundary.kind.into(),
                            path: boundary.url.clone(),
                            accepted_path: via.url.clone(),
                            timestamp,
                        });
                    }
                }),
            }
        }

        if need_full_reload {
            info!(file = %file, "page reload");
            return self.channel.send(&HmrPayload::FullReload { path: None });
        }

        if updates.is_empty() {
            debug!(file = %file, "no update happened");
            return Ok(());
        }

        for update in &updates {
            info!(path = %update.path, "hmr update");
        }
        self.channel.send(&HmrPayload::Update { updates })
    }

    /// Find the modules that accept an update of `node`.
    ///
    /// Runs against one consistent snapshot of the graph.
    pub fn propagate_update(&self, node: NodeId) -> Propagation {
        self.graph.view(|view| {
            let mut boundaries = Vec::new();
            let mut chain = vec![node];
            if propagate(view, node, &mut boundaries, &mut chain) {
                Propagation::DeadEnd
            } else {
                Propagation::Boundaries(boundaries)
            }
        })
    }

    /// Tell clients that `nodes` are no longer imported.
    pub fn handle_pruned_modules(&self, nodes: &NodeSet) -> Result<()> {
        let timestamp = now_millis();
        for &node in nodes {
            self.graph.set_last_hmr_timestamp(node, timestamp)?;
        }

        let paths = self.graph.view(|view| {
            nodes
                .iter()
                .filter_map(|&node| view.node(node))
                .map(|node| node.url.clone())
                .collect::<Vec<_>>()
        });
        debug!(count = paths.len(), "pruning modules");
        self.channel.send(&HmrPayload::Prune { paths })
    }

    /// Forward a compile error to clients (buffered if none is connected).
    pub fn send_error(&self, err: ErrorPayload) -> Result<()> {
        error!(id = err.id.as_deref().unwrap_or(""), "compile error: {}", err.message);
        self.channel.send(&HmrPayload::Error { err })
    }

    /// Drive the engine from watcher events until the watcher goes away.
    pub async fn run(&self, mut changes: mpsc::Receiver<FileChange>) {
        while let Some(change) = changes.recv().await {
            let result = match &change {
                FileChange::Modified(path) => self.handle_file_change(path),
                FileChange::Created(path) | FileChange::Removed(path) => {
                    self.handle_file_add_unlink(path)
                }
            };
            if let Err(err) = result {
                error!(path = %change.path().display(), error = %err, "failed to handle file change");
            }
        }
        debug!("file watcher closed, stopping HMR engine");
    }

    fn short_name(&self, file: &str) -> String {
        file.strip_prefix(&self.root)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
            .unwrap_or_else(|| file.to_string())
    }

    fn root_relative(&self, file: &str) -> Option<String> {
        file.strip_prefix(&self.root)
            .filter(|rest| rest.starts_with('/'))
            .map(str::to_string)
    }
}

/// Returns `true` on a dead end.
fn propagate(
    view: GraphView<'_>,
    node: NodeId,
    boundaries: &mut Vec<Boundary>,
    chain: &mut Vec<NodeId>,
) -> bool {
    let Some(current) = view.node(node) else {
        return true;
    };

    if current.is_self_accepting {
        push_boundary(boundaries, node, node);

        // Style importers may list any file as a dependency
        for &importer in &current.importers {
            let is_style_importer = view
                .node(importer)
                .is_some_and(|module| is_css_request(&module.url));
            if is_style_importer && !chain.contains(&importer) {
                chain.push(importer);
                propagate(view, importer, boundaries, chain);
                chain.pop();
            }
        }
        return false;
    }

    if current.importers.is_empty() {
        return true;
    }

    // A script imported only by stylesheets cannot be hot-swapped
    if !is_css_request(&current.url)
        && current.importers.iter().all(|&importer| {
            view.node(importer)
                .is_some_and(|module| is_css_request(&module.url))
        })
    {
        return true;
    }

    for &importer in &current.importers {
        let Some(module) = view.node(importer) else {
            return true;
        };

        if module.accepts(node) {
            push_boundary(boundaries, importer, node);
            continue;
        }

        if chain.contains(&importer) {
            // circular
            return true;
        }

        chain.push(importer);
        let dead_end = propagate(view, importer, boundaries, chain);
        chain.pop();
        if dead_end {
            return true;
        }
    }
    false
}

fn push_boundary(boundaries: &mut Vec<Boundary>, boundary: NodeId, accepted_via: NodeId) {
    let entry = Boundary {
        boundary,
        accepted_via,
    };
    if !boundaries.contains(&entry) {
        boundaries.push(entry);
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
