//! Resolver port.
//!
//! The graph never resolves paths itself. Whatever plugin pipeline the dev
//! server runs is exposed to the graph through the [`Resolver`] trait and
//! injected at construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque key/value metadata attached by the resolver.
pub type ModuleMeta = serde_json::Map<String, serde_json::Value>;

/// Result type for resolver calls.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Errors a resolver may report.
///
/// The graph treats every resolver error like a miss and falls back to the
/// cleaned url, so these never reach graph callers.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Resolution of a specific url failed
    #[error("Failed to resolve '{url}': {reason}")]
    Failed { url: String, reason: String },

    /// Other resolver failure
    #[error("Resolver error: {0}")]
    Other(String),
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedId {
    /// Canonical module identifier. May carry a query string.
    pub id: String,
    /// Optional metadata to attach to the module node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ModuleMeta>,
}

impl ResolvedId {
    /// Resolution without metadata.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            meta: None,
        }
    }

    /// Attach metadata to the resolution.
    pub fn with_meta(mut self, meta: ModuleMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Maps a raw module specifier to a canonical identifier.
///
/// Implementations must be deterministic for a given `(url, ssr)` pair as
/// long as the file system does not change. `Ok(None)` means "not found".
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use kiln_graph::{ResolveResult, ResolvedId, Resolver};
///
/// #[derive(Debug)]
/// struct RootResolver;
///
/// #[async_trait]
/// impl Resolver for RootResolver {
///     async fn resolve(&self, url: &str, _ssr: bool) -> ResolveResult<Option<ResolvedId>> {
///         Ok(Some(ResolvedId::new(format!("/project{}", url))))
///     }
/// }
/// ```
#[async_trait]
pub trait Resolver: Send + Sync + std::fmt::Debug {
    /// Resolve `url` for the client (`ssr == false`) or server graph.
    async fn resolve(&self, url: &str, ssr: bool) -> ResolveResult<Option<ResolvedId>>;
}

/// Resolver that never finds anything, so every url maps to itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

#[async_trait]
impl Resolver for IdentityResolver {
    async fn resolve(&self, _url: &str, _ssr: bool) -> ResolveResult<Option<ResolvedId>> {
        Ok(None)
    }
}
