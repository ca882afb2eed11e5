//! Project file watcher feeding the HMR engine.
//!
//! Watches the project root recursively, drops ignored paths and debounces
//! repeated events per path. The graph itself never debounces.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use kiln_config::WatchConfig;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap as HashMap;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{HmrError, Result};

/// Capacity of the change queue between the watcher thread and the engine.
const CHANGE_QUEUE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_kind(kind: &EventKind, path: PathBuf) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path)),
            EventKind::Modify(_) => Some(FileChange::Modified(path)),
            EventKind::Remove(_) => Some(FileChange::Removed(path)),
            _ => None,
        }
    }
}

/// Recursive watcher over the project root.
///
/// Dropping it stops watching and closes the change receiver.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("root", &self.root).finish()
    }
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// `ignore` holds directory names (`node_modules`) or extension patterns
    /// (`*.log`). Events for the same path within `debounce_ms` of the last
    /// forwarded one are dropped.
    pub fn new(
        root: PathBuf,
        ignore: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(HmrError::RootNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANGE_QUEUE);
        let mut debouncer = Debouncer::new(Duration::from_millis(debounce_ms));
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "file watcher error");
                    return;
                }
            };

            for path in event.paths {
                if should_ignore(&path, &watch_root, &ignore) {
                    continue;
                }

                if !debouncer.accept(&path, Instant::now()) {
                    continue;
                }

                let Some(change) = FileChange::from_kind(&event.kind, path) else {
                    continue;
                };
                trace!(?change, "file change");

                // Runs on the notify thread, outside the runtime
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn from_config(
        root: PathBuf,
        config: &WatchConfig,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        Self::new(root, config.ignore.clone(), config.debounce_ms)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Per-path event debounce.
///
/// Only paths seen within the last window are remembered.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::default(),
        }
    }

    /// Whether an event for `path` at `now` should be forwarded.
    fn accept(&mut self, path: &Path, now: Instant) -> bool {
        let window = self.window;
        self.last_seen
            .retain(|_, seen| now.saturating_duration_since(*seen) < window);
        if self.last_seen.contains_key(path) {
            return false;
        }
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }
}

/// Paths outside `root` and paths matching an ignore pattern are skipped.
fn should_ignore(path: &Path, root: &Path, ignore: &[String]) -> bool {
    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };

    let file_name = rel_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    ignore.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => file_name.ends_with(suffix),
        None => rel_path
            .components()
            .any(|component| component.as_os_str() == pattern.as_str()),
    })
}
