//! Cross-call memoization of resolutions.
//!
//! Keys are built from an explicit canonical rendering of every argument
//! that can influence a resolution: the requested names in order, each step
//! context, and the configuration. Two calls share a cache entry only if all
//! three render identically. Serde types render as compact JSON with object
//! keys sorted (see `json_key`).

use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::core::accumulator::Accumulator;
use crate::core::error::ResolutionResult;
use crate::core::registry::InputRegistry;
use crate::core::resolver::{Resolution, build_steps};
use crate::core::types::BuildDomain;

/// Capacity used by `CachedResolver::new`.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Total, deterministic rendering of a value for cache keying.
///
/// Implementations must render every field that can change dependencies or
/// build output, and must never render two such values identically.
pub trait CanonicalKey {
    fn canonical_key(&self) -> String;
}

/// Compact JSON of `value` with every object's keys in sorted order.
///
/// Goes through `serde_json::Value`, whose maps are ordered by key, so field
/// declaration order never leaks into the key. A value that cannot be
/// represented as JSON (a map with non-string keys) renders as the
/// serialization error, prefixed so it cannot collide with valid JSON.
pub fn json_key<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(json) => json.to_string(),
        Err(err) => format!("!{err}"),
    }
}

impl CanonicalKey for str {
    fn canonical_key(&self) -> String {
        format!("{self:?}")
    }
}

impl CanonicalKey for String {
    fn canonical_key(&self) -> String {
        self.as_str().canonical_key()
    }
}

impl<T: CanonicalKey> CanonicalKey for Option<T> {
    fn canonical_key(&self) -> String {
        match self {
            Some(value) => format!("Some({})", value.canonical_key()),
            None => "None".to_string(),
        }
    }
}

impl CanonicalKey for () {
    fn canonical_key(&self) -> String {
        "()".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    requested: Vec<String>,
    step_contexts: Vec<String>,
    config: String,
}

impl ResolutionKey {
    pub fn new<C, X, S>(requested: &[S], step_contexts: &[X], config: &C) -> Self
    where
        C: CanonicalKey + ?Sized,
        X: CanonicalKey,
        S: AsRef<str>,
    {
        Self {
            requested: requested
                .iter()
                .map(|name| name.as_ref().to_string())
                .collect(),
            step_contexts: step_contexts.iter().map(CanonicalKey::canonical_key).collect(),
            config: config.canonical_key(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct CacheInner<D: BuildDomain, A> {
    entries: IndexMap<ResolutionKey, Arc<Resolution<D, A>>>,
    hits: u64,
    misses: u64,
}

/// `build_steps` behind a bounded memoization cache.
///
/// The registry is immutable once wrapped. The cache sits behind a single
/// lock held for the whole resolution, so concurrent identical requests
/// build once. Failed resolutions are not cached. When full, the oldest
/// entry is evicted.
pub struct CachedResolver<D: BuildDomain, A> {
    registry: Arc<InputRegistry<D>>,
    capacity: usize,
    inner: Mutex<CacheInner<D, A>>,
}

impl<D, A> CachedResolver<D, A>
where
    D: BuildDomain,
    D::Config: CanonicalKey,
    D::StepContext: CanonicalKey,
    A: Accumulator<Action = D::Action>,
{
    pub fn new(registry: Arc<InputRegistry<D>>) -> Self {
        Self::with_capacity(registry, DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero disables memoization.
    pub fn with_capacity(registry: Arc<InputRegistry<D>>, capacity: usize) -> Self {
        Self {
            registry,
            capacity,
            inner: Mutex::new(CacheInner {
                entries: IndexMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn registry(&self) -> &InputRegistry<D> {
        &self.registry
    }

    pub fn resolve<F, S>(
        &self,
        requested: &[S],
        step_contexts: &[D::StepContext],
        config: &D::Config,
        accumulate: F,
    ) -> ResolutionResult<Arc<Resolution<D, A>>>
    where
        F: Fn() -> A,
        S: AsRef<str>,
    {
        let key = ResolutionKey::new(requested, step_contexts, config);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let cached = inner.entries.get(&key).cloned();
        if let Some(hit) = cached {
            inner.hits += 1;
            debug!(requested = ?key.requested, "resolution cache hit");
            return Ok(hit);
        }

        inner.misses += 1;
        debug!(requested = ?key.requested, "resolution cache miss");
        let resolution = Arc::new(build_steps(
            &*self.registry,
            requested,
            step_contexts,
            config,
            accumulate,
        )?);

        if self.capacity > 0 {
            if inner.entries.len() >= self.capacity {
                inner.entries.shift_remove_index(0);
            }
            inner.entries.insert(key, Arc::clone(&resolution));
        }
        Ok(resolution)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }
}
