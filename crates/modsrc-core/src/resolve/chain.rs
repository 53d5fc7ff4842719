//! Ordered dispatch across resolvers.

use std::sync::Arc;

use crate::MemFs;
use crate::ResolveContext;
use crate::ResolveError;
use crate::ResolverConfig;
use crate::Result;
use crate::SourceDescriptor;
use crate::http;
use crate::resolve::CacheResolver;
use crate::resolve::LocalResolver;
use crate::resolve::RegistryResolver;
use crate::resolve::RemoteResolver;
use crate::resolve::ResolutionCache;
use crate::resolve::Resolved;
use crate::resolve::Resolver;

/// Tries resolvers in order; the first to claim a descriptor decides the
/// outcome.
///
/// The standard order is local, cache, registry, remote. Successful results
/// of resolvers that report [`Resolver::caches_results`] are stored in the
/// chain's memo, which the cache resolver reads from.
///
/// # Examples
///
/// ```
/// use modsrc_core::MemFs;
/// use modsrc_core::ResolveContext;
/// use modsrc_core::ResolverChain;
/// use modsrc_core::ResolverConfig;
/// use modsrc_core::SourceDescriptor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut base = MemFs::new();
/// base.mkdir_all("modules/vpc", 0o755)?;
///
/// let chain = ResolverChain::standard(&ResolverConfig::default())?;
/// let resolved = chain
///     .resolve(&ResolveContext::new(), &SourceDescriptor::new("./modules/vpc"), &base)
///     .await?
///     .expect("local path is always claimed");
/// assert_eq!(resolved.relative_path, "modules/vpc");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn Resolver>>,
    memo: ResolutionCache,
}

impl ResolverChain {
    /// Creates a chain over `resolvers` with no memo.
    #[must_use]
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>) -> Self {
        Self {
            resolvers,
            memo: ResolutionCache::new(0),
        }
    }

    /// Records successful results in `memo`.
    #[must_use]
    pub fn with_memo(mut self, memo: ResolutionCache) -> Self {
        self.memo = memo;
        self
    }

    /// Builds the standard chain from configuration: local, cache, registry,
    /// remote, sharing one HTTP client.
    pub fn standard(config: &ResolverConfig) -> Result<Self> {
        let client = http::build_client(config)?;
        let memo = ResolutionCache::new(config.cache_capacity);
        let remote = Arc::new(RemoteResolver::new(client.clone(), config.stage_limits));
        let registry =
            RegistryResolver::new(client, config.registry_url.clone(), Arc::clone(&remote));

        let resolvers: Vec<Arc<dyn Resolver>> = vec![
            Arc::new(LocalResolver::new()),
            Arc::new(CacheResolver::new(memo.clone())),
            Arc::new(registry),
            remote,
        ];
        Ok(Self::new(resolvers).with_memo(memo))
    }

    /// Names of the resolvers, in the order they are tried.
    pub fn resolver_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resolvers.iter().map(|r| r.name())
    }

    /// Returns the memo shared with the cache resolver.
    #[must_use]
    pub fn memo(&self) -> &ResolutionCache {
        &self.memo
    }

    /// Resolves `desc` against `base`.
    ///
    /// Returns `Ok(None)` when no resolver recognises the source. An error
    /// from the claiming resolver is returned as is; later resolvers are not
    /// tried.
    pub async fn resolve(
        &self,
        ctx: &ResolveContext,
        desc: &SourceDescriptor,
        base: &MemFs,
    ) -> Result<Option<Resolved>> {
        ctx.check()?;

        for resolver in &self.resolvers {
            match resolver.resolve(ctx, desc, base).await {
                Ok(None) => continue,
                Ok(Some(resolved)) => {
                    tracing::debug!(
                        resolver = resolver.name(),
                        module = desc.display_name(),
                        relative_path = %resolved.relative_path,
                        "module resolved"
                    );
                    if resolver.caches_results() {
                        self.memo.insert(desc, &resolved);
                    }
                    return Ok(Some(resolved));
                }
                Err(err) => {
                    tracing::debug!(
                        resolver = resolver.name(),
                        module = desc.display_name(),
                        error = %err,
                        "module resolution failed"
                    );
                    return Err(err);
                }
            }
        }

        tracing::debug!(module = desc.display_name(), source = %desc.source, "no resolver applies");
        Ok(None)
    }

    /// Like [`ResolverChain::resolve`], but fails with
    /// [`ResolveError::UnsupportedSource`] when no resolver applies.
    pub async fn resolve_required(
        &self,
        ctx: &ResolveContext,
        desc: &SourceDescriptor,
        base: &MemFs,
    ) -> Result<Resolved> {
        self.resolve(ctx, desc, base)
            .await?
            .ok_or_else(|| ResolveError::UnsupportedSource {
                reference: desc.source.clone(),
            })
    }
}
