//! Process-local memo of completed resolutions.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use lru::LruCache;

use crate::MemFs;
use crate::ResolveContext;
use crate::Result;
use crate::SourceDescriptor;
use crate::resolve::Resolved;
use crate::resolve::Resolver;

type CacheKey = (String, String);

/// Bounded memo keyed by (source, version).
///
/// Clones share the same storage. Access is serialised by a mutex that is
/// never held across an await point.
#[derive(Debug, Clone)]
pub struct ResolutionCache {
    inner: Option<Arc<Mutex<LruCache<CacheKey, Resolved>>>>,
}

impl ResolutionCache {
    /// Creates a memo holding up to `capacity` resolutions. A capacity of
    /// zero disables it.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Arc::new(Mutex::new(LruCache::new(cap)))),
        }
    }

    fn key(desc: &SourceDescriptor) -> CacheKey {
        (desc.source.clone(), desc.version.trim().to_string())
    }

    fn lock(
        memo: &Mutex<LruCache<CacheKey, Resolved>>,
    ) -> MutexGuard<'_, LruCache<CacheKey, Resolved>> {
        memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the memoized resolution for the descriptor, if any.
    #[must_use]
    pub fn get(&self, desc: &SourceDescriptor) -> Option<Resolved> {
        let memo = self.inner.as_ref()?;
        Self::lock(memo).get(&Self::key(desc)).cloned()
    }

    /// Remembers a resolution.
    pub fn insert(&self, desc: &SourceDescriptor, resolved: &Resolved) {
        if let Some(memo) = &self.inner {
            Self::lock(memo).put(Self::key(desc), resolved.clone());
        }
    }

    /// Number of memoized resolutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |memo| Self::lock(memo).len())
    }

    /// Returns `true` if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every memoized resolution.
    pub fn clear(&self) {
        if let Some(memo) = &self.inner {
            Self::lock(memo).clear();
        }
    }
}

/// Serves descriptors that were already resolved in this process.
#[derive(Debug, Clone)]
pub struct CacheResolver {
    cache: ResolutionCache,
}

impl CacheResolver {
    /// Creates a resolver reading from `cache`.
    #[must_use]
    pub fn new(cache: ResolutionCache) -> Self {
        Self { cache }
    }
}

#[async_trait::async_trait]
impl Resolver for CacheResolver {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn resolve(
        &self,
        _ctx: &ResolveContext,
        desc: &SourceDescriptor,
        _base: &MemFs,
    ) -> Result<Option<Resolved>> {
        let hit = self.cache.get(desc);
        if hit.is_some() {
            tracing::debug!(
                module = desc.display_name(),
                source = %desc.source,
                "using memoized resolution"
            );
        }
        Ok(hit)
    }
}
