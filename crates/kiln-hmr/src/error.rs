//! Error types for the HMR channel, engine and watcher.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HmrError>;

#[derive(Debug, Error)]
pub enum HmrError {
    /// The dedicated listener could not bind for a reason other than the
    /// address already being in use.
    #[error("failed to bind HMR server to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize HMR payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HMR server error: {0}")]
    Server(String),

    #[error("HMR server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("watch root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error(transparent)]
    Graph(#[from] kiln_graph::GraphError),
}
