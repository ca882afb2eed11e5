//! Test utilities for exercising the graph without a plugin pipeline.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::resolver::{ResolveError, ResolveResult, ResolvedId, Resolver};

/// Map-backed resolver.
///
/// Urls without a registered mapping resolve to `None`. Every call is
/// recorded, and an optional per-url delay simulates slow plugin chains.
#[derive(Debug, Default)]
pub struct TestResolver {
    mappings: Mutex<HashMap<String, ResolvedId>>,
    failures: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl TestResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `url` to `id`.
    pub fn add(&self, url: impl Into<String>, id: impl Into<String>) -> &Self {
        self.mappings
            .lock()
            .insert(url.into(), ResolvedId::new(id));
        self
    }

    /// Resolve `url` to a full [`ResolvedId`], metadata included.
    pub fn add_resolved(&self, url: impl Into<String>, resolved: ResolvedId) -> &Self {
        self.mappings.lock().insert(url.into(), resolved);
        self
    }

    /// Make resolution of `url` fail.
    pub fn fail(&self, url: impl Into<String>, reason: impl Into<String>) -> &Self {
        self.failures.lock().insert(url.into(), reason.into());
        self
    }

    /// Delay resolution of `url`.
    pub fn delay(&self, url: impl Into<String>, delay: Duration) -> &Self {
        self.delays.lock().insert(url.into(), delay);
        self
    }

    /// Every `(url, ssr)` the resolver was asked for, in call order.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Resolver for TestResolver {
    async fn resolve(&self, url: &str, ssr: bool) -> ResolveResult<Option<ResolvedId>> {
        self.calls.lock().push((url.to_string(), ssr));

        let delay = self.delays.lock().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = self.failures.lock().get(url) {
            return Err(ResolveError::Failed {
                url: url.to_string(),
                reason: reason.clone(),
            });
        }

        Ok(self.mappings.lock().get(url).cloned())
    }
}
