//! Local path resolution.

use crate::FsError;
use crate::MemFs;
use crate::ResolveContext;
use crate::Result;
use crate::SourceDescriptor;
use crate::resolve::Resolved;
use crate::resolve::Resolver;
use crate::source;
use crate::vfs::path;

/// Resolves `./`, `../` and absolute paths inside the base filesystem.
///
/// No staging happens: the result is a clone of the base filesystem with
/// `relative_path` pointing at the module directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalResolver;

impl LocalResolver {
    /// Creates a local resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_local(source: &str) -> bool {
        !source::has_scheme(source)
            && (source == "."
                || source == ".."
                || source.starts_with("./")
                || source.starts_with("../")
                || source.starts_with('/'))
    }
}

#[async_trait::async_trait]
impl Resolver for LocalResolver {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn resolve(
        &self,
        _ctx: &ResolveContext,
        desc: &SourceDescriptor,
        base: &MemFs,
    ) -> Result<Option<Resolved>> {
        if !Self::is_local(&desc.source) {
            return Ok(None);
        }

        let (module_source, subdir) = source::split_subdir(&desc.source);
        let target = if module_source.starts_with('/') {
            path::normalize(&module_source)?
        } else {
            path::join(&desc.module_path, &module_source)?
        };
        let target = path::join(&target, &subdir)?;
        let target = path::join(&target, &desc.relative_path)?;

        if !base.is_dir(&target) {
            return Err(if base.exists(&target) {
                FsError::NotADirectory(target)
            } else {
                FsError::NotFound(target)
            }
            .into());
        }

        tracing::debug!(module = desc.display_name(), path = %target, "resolved local module");
        Ok(Some(Resolved {
            relative_path: target,
            ..Resolved::new(base.clone())
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ResolveError;

    fn base() -> MemFs {
        let mut fs = MemFs::new();
        fs.mkdir_all("envs/prod", 0o755).unwrap();
        fs.mkdir_all("modules/vpc/nested", 0o755).unwrap();
        fs.write_file("modules/vpc/main.tf", b"vpc".as_slice(), 0o644)
            .unwrap();
        fs
    }

    async fn resolve(desc: &SourceDescriptor) -> Result<Option<Resolved>> {
        LocalResolver::new()
            .resolve(&ResolveContext::new(), desc, &base())
            .await
    }

    #[tokio::test]
    async fn test_relative_to_module_path() {
        let desc = SourceDescriptor::new("../../modules/vpc").with_module_path("envs/prod");
        let resolved = resolve(&desc).await.unwrap().unwrap();
        assert_eq!(resolved.relative_path, "modules/vpc");
        assert!(resolved.prefix.is_empty());
        assert!(resolved.download_path.is_empty());
        assert_eq!(resolved.module_fs().unwrap().read("main.tf").unwrap(), b"vpc");
    }

    #[tokio::test]
    async fn test_absolute_path_and_subdir() {
        let desc = SourceDescriptor::new("/modules/vpc//nested").with_module_path("envs/prod");
        let resolved = resolve(&desc).await.unwrap().unwrap();
        assert_eq!(resolved.relative_path, "modules/vpc/nested");
    }

    #[tokio::test]
    async fn test_not_applicable_to_other_shapes() {
        for source in [
            "hashicorp/consul/aws",
            "https://example.com/module.tar.gz",
            "git::https://github.com/org/repo.git",
            "github.com/org/repo",
        ] {
            assert!(resolve(&SourceDescriptor::new(source)).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_missing_directory_is_claimed_failure() {
        let err = resolve(&SourceDescriptor::new("./missing")).await.unwrap_err();
        assert!(
            matches!(err, ResolveError::Filesystem(FsError::NotFound(ref p)) if p == "missing")
        );
    }

    #[tokio::test]
    async fn test_file_is_not_a_module() {
        let err = resolve(&SourceDescriptor::new("./modules/vpc/main.tf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Filesystem(FsError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_escaping_root_fails() {
        let err = resolve(&SourceDescriptor::new("../../..").with_module_path("envs"))
            .await
            .unwrap_err();
        assert!(err.is_filesystem());
    }

    #[tokio::test]
    async fn test_ignores_download_policy() {
        let desc = SourceDescriptor::new("./modules/vpc").allow_downloads(false);
        assert!(resolve(&desc).await.unwrap().is_some());
    }
}
