//! Hot module replacement for the kiln dev server.
//!
//! ```text
//! FileWatcher ──FileChange──▶ HmrEngine ──▶ ModuleGraph (invalidate)
//!                                 │
//!                                 └──HmrPayload──▶ HmrChannel ──▶ clients
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kiln_config::ConfigLoader;
//! use kiln_graph::{IdentityResolver, ModuleGraph};
//! use kiln_hmr::{FileWatcher, HmrChannel, HmrEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new(".").load()?;
//!
//! let graph = ModuleGraph::new(Arc::new(IdentityResolver));
//! let channel = HmrChannel::from_config(&config.hmr);
//! channel.listen(&config.hmr).await?;
//!
//! let (_watcher, changes) = FileWatcher::from_config(config.root.clone(), &config.watch)?;
//! let engine = HmrEngine::new(graph, channel.clone(), &config.root);
//! engine.run(changes).await;
//!
//! channel.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod engine;
pub mod error;
pub mod logger;
pub mod payload;
pub mod watcher;

pub use channel::{HmrChannel, HmrReceiver};
pub use engine::{Boundary, HmrEngine, Propagation};
pub use error::{HmrError, Result};
pub use payload::{ErrorLocation, ErrorPayload, HmrPayload, Update, UpdateKind};
pub use watcher::{FileChange, FileWatcher};
