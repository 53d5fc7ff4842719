//! Resolvers and the chain that dispatches between them.
//!
//! A [`Resolver`] looks at a [`SourceDescriptor`] and either declines it
//! (`Ok(None)`), or claims it and reports the outcome (`Ok(Some(_))` or
//! `Err(_)`). The [`ResolverChain`] stops at the first claim; a claimed but
//! failed resolution is never retried by a later resolver.

mod cache;
mod chain;
mod local;
mod registry;
mod remote;

use std::fmt::Debug;

pub use cache::CacheResolver;
pub use cache::ResolutionCache;
pub use chain::ResolverChain;
pub use local::LocalResolver;
pub use registry::RegistryResolver;
pub use remote::RemoteResolver;

use crate::FsError;
use crate::MemFs;
use crate::ResolveContext;
use crate::Result;
use crate::SourceDescriptor;
use crate::vfs::path;

/// A completed resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Filesystem holding the module. `relative_path` is valid inside it.
    pub fs: MemFs,

    /// Path segment to prepend when interpreting paths in `fs`. Empty unless
    /// the resolver staged files under a synthetic root.
    pub prefix: String,

    /// Location the raw archive was staged to. Empty when nothing was
    /// downloaded.
    pub download_path: String,

    /// Sub-path of `fs` that is the module's effective root.
    pub relative_path: String,
}

impl Resolved {
    /// Creates a result with no prefix or download path.
    #[must_use]
    pub fn new(fs: MemFs) -> Self {
        Self {
            fs,
            prefix: String::new(),
            download_path: String::new(),
            relative_path: String::new(),
        }
    }

    /// Returns the module root inside `fs`: `prefix` joined with
    /// `relative_path`.
    pub fn root(&self) -> std::result::Result<String, FsError> {
        path::join(&self.prefix, &self.relative_path)
    }

    /// Returns a filesystem rebased so that the module root is its root.
    pub fn module_fs(&self) -> std::result::Result<MemFs, FsError> {
        self.fs.sub(&self.root()?)
    }
}

/// Something that can turn a source descriptor into a filesystem.
///
/// # Contract
///
/// - `Ok(None)`: the descriptor's shape is not recognised; the chain moves
///   on. Must be returned without side effects or network I/O.
/// - `Ok(Some(_))` / `Err(_)`: the resolver claimed the descriptor. The chain
///   stops here.
///
/// Resolvers that perform network I/O must decline descriptors whose
/// `allow_downloads` is `false`, and must run every request under `ctx`.
/// The base filesystem is shared; resolvers never mutate it.
#[async_trait::async_trait]
pub trait Resolver: Debug + Send + Sync {
    /// Short name used in log events.
    fn name(&self) -> &'static str;

    /// Whether successful results should be remembered by the chain's memo.
    fn caches_results(&self) -> bool {
        false
    }

    /// Attempts to resolve `desc` against `base`.
    async fn resolve(
        &self,
        ctx: &ResolveContext,
        desc: &SourceDescriptor,
        base: &MemFs,
    ) -> Result<Option<Resolved>>;
}

#[async_trait::async_trait]
impl<R> Resolver for std::sync::Arc<R>
where
    R: Resolver + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn caches_results(&self) -> bool {
        (**self).caches_results()
    }

    async fn resolve(
        &self,
        ctx: &ResolveContext,
        desc: &SourceDescriptor,
        base: &MemFs,
    ) -> Result<Option<Resolved>> {
        (**self).resolve(ctx, desc, base).await
    }
}
