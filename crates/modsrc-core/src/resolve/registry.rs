//! Module registry resolution.
//!
//! A registry coordinate `namespace/name/provider` is resolved in two
//! requests: the version listing (only when a constraint is given) and the
//! download endpoint, which answers `204 No Content` with the real source
//! location in the `X-Terraform-Get` header. That location is then handed to
//! the [`RemoteResolver`].

use std::sync::Arc;

use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::MemFs;
use crate::ResolveContext;
use crate::ResolveError;
use crate::Result;
use crate::SourceDescriptor;
use crate::VersionConstraint;
use crate::http;
use crate::resolve::RemoteResolver;
use crate::resolve::Resolved;
use crate::resolve::Resolver;
use crate::source;
use crate::version::select_version;

/// Header carrying the version the client asks for.
const VERSION_HEADER: &str = "X-Terraform-Version";

/// Header carrying the module source location.
const LOCATION_HEADER: &str = "X-Terraform-Get";

/// Hosts whose `host/owner/repo` references are VCS shorthands, not
/// registry coordinates.
const VCS_HOSTS: [&str; 2] = ["github.com", "bitbucket.org"];

#[derive(Debug, Deserialize)]
struct ModuleVersions {
    #[serde(default)]
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    #[serde(default)]
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
}

/// A registry coordinate split from a source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Coordinate {
    /// `namespace/name/provider`.
    module: String,
    /// Path inside the module source.
    relative_path: String,
}

impl Coordinate {
    /// Parses `namespace/name/provider[/extra][//subdir]`.
    ///
    /// Returns `None` for any other shape.
    fn parse(reference: &str) -> Option<Self> {
        if source::has_scheme(reference) {
            return None;
        }
        let (module_source, subdir) = source::split_subdir(reference);
        let segments: Vec<&str> = module_source.split('/').collect();
        if !(3..=4).contains(&segments.len()) {
            return None;
        }
        if !segments.iter().all(|s| is_segment(s)) {
            return None;
        }
        if VCS_HOSTS.contains(&segments[0]) {
            return None;
        }

        let relative_path = segments
            .get(3)
            .copied()
            .into_iter()
            .chain(Some(subdir.as_str()).filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join("/");

        Some(Self {
            module: segments[..3].join("/"),
            relative_path,
        })
    }
}

/// A coordinate segment is `[A-Za-z0-9_.-]+`, excluding `.` and `..`, so it
/// can be placed in a URL path unescaped.
fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

/// Resolves `namespace/name/provider` coordinates against a module registry.
#[derive(Debug, Clone)]
pub struct RegistryResolver {
    client: Client,
    registry_url: String,
    remote: Arc<RemoteResolver>,
}

impl RegistryResolver {
    /// Creates a registry resolver that delegates downloads to `remote`.
    #[must_use]
    pub fn new(
        client: Client,
        registry_url: impl Into<String>,
        remote: Arc<RemoteResolver>,
    ) -> Self {
        let registry_url = registry_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            registry_url,
            remote,
        }
    }

    /// Fetches the version listing and selects the highest version
    /// satisfying `constraint`.
    async fn resolve_version(
        &self,
        ctx: &ResolveContext,
        module: &str,
        constraint: &VersionConstraint,
    ) -> Result<String> {
        let url = format!("{}/v1/modules/{module}/versions", self.registry_url);
        tracing::debug!(url = %url, "requesting module versions from registry");

        let response = http::send(ctx, &url, self.client.get(&url)).await?;
        http::expect_status(&url, &response, StatusCode::OK)?;
        let body = http::read_body(ctx, &url, response).await?;

        let listing: ModuleVersions =
            serde_json::from_slice(&body).map_err(|e| ResolveError::InvalidResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let [entry] = listing.modules.as_slice() else {
            return Err(ResolveError::UnexpectedModuleCount {
                count: listing.modules.len(),
            });
        };
        if entry.versions.is_empty() {
            return Err(ResolveError::NoVersionsAvailable {
                module: module.to_string(),
            });
        }

        let selected = select_version(constraint, entry.versions.iter().map(|v| v.version.as_str()))
            .ok_or_else(|| ResolveError::NoMatchingVersion {
                constraint: constraint.to_string(),
            })?;
        let selected = selected.to_string();
        tracing::debug!(
            module,
            version = %selected,
            constraint = %constraint,
            "selected module version"
        );
        Ok(selected)
    }

    /// Asks the download endpoint where the module source lives.
    async fn source_location(
        &self,
        ctx: &ResolveContext,
        module: &str,
        version: Option<&str>,
    ) -> Result<String> {
        let url = match version {
            Some(version) => {
                format!("{}/v1/modules/{module}/{version}/download", self.registry_url)
            }
            None => format!("{}/v1/modules/{module}/download", self.registry_url),
        };
        tracing::debug!(url = %url, "requesting module source from registry");

        let mut request = self.client.get(&url);
        if let Some(version) = version {
            request = request.header(VERSION_HEADER, version);
        }
        let response = http::send(ctx, &url, request).await?;
        http::expect_status(&url, &response, StatusCode::NO_CONTENT)?;

        let location = response
            .headers()
            .get(LOCATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ResolveError::InvalidResponse {
                url: url.clone(),
                reason: format!("missing {LOCATION_HEADER} header"),
            })?;

        absolute_location(&url, location)
    }
}

/// Resolves a relative location against the download endpoint.
fn absolute_location(endpoint: &str, location: &str) -> Result<String> {
    let relative =
        location.starts_with('/') || location.starts_with("./") || location.starts_with("../");
    if !relative || source::has_scheme(location) {
        return Ok(location.to_string());
    }
    Url::parse(endpoint)
        .and_then(|base| base.join(location))
        .map(String::from)
        .map_err(|e| ResolveError::InvalidResponse {
            url: endpoint.to_string(),
            reason: format!("invalid {LOCATION_HEADER} location '{location}': {e}"),
        })
}

#[async_trait::async_trait]
impl Resolver for RegistryResolver {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn caches_results(&self) -> bool {
        true
    }

    async fn resolve(
        &self,
        ctx: &ResolveContext,
        desc: &SourceDescriptor,
        base: &MemFs,
    ) -> Result<Option<Resolved>> {
        if !desc.allow_downloads {
            return Ok(None);
        }
        let Some(coordinate) = Coordinate::parse(&desc.source) else {
            return Ok(None);
        };

        let version = if desc.has_version() {
            let constraint = VersionConstraint::parse(&desc.version)?;
            Some(self.resolve_version(ctx, &coordinate.module, &constraint).await?)
        } else {
            None
        };

        let location = self
            .source_location(ctx, &coordinate.module, version.as_deref())
            .await?;
        tracing::debug!(
            module = desc.display_name(),
            source = %location,
            "module resolved via registry to new source"
        );

        let redirected = desc
            .clone()
            .with_source(location.clone())
            .with_relative_path(coordinate.relative_path);

        self.remote
            .resolve(ctx, &redirected, base)
            .await?
            .map(Some)
            .ok_or(ResolveError::UnsupportedSource {
                reference: location,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::StageLimits;

    fn coordinate(reference: &str) -> Option<(String, String)> {
        Coordinate::parse(reference).map(|c| (c.module, c.relative_path))
    }

    #[test]
    fn test_coordinate_three_segments() {
        assert_eq!(
            coordinate("hashicorp/consul/aws"),
            Some(("hashicorp/consul/aws".into(), String::new()))
        );
    }

    #[test]
    fn test_coordinate_fourth_segment_is_relative_path() {
        assert_eq!(
            coordinate("hashicorp/consul/aws/modules"),
            Some(("hashicorp/consul/aws".into(), "modules".into()))
        );
    }

    #[test]
    fn test_coordinate_subdir() {
        assert_eq!(
            coordinate("hashicorp/consul/aws//modules/consul-cluster"),
            Some(("hashicorp/consul/aws".into(), "modules/consul-cluster".into()))
        );
    }

    #[test]
    fn test_coordinate_rejects_other_shapes() {
        for reference in [
            "consul",
            "hashicorp/consul",
            "a/b/c/d/e",
            "https://example.com/a/b",
            "git::https://github.com/a/b",
            "./a/b",
            "../a/b/c",
            "/a/b/c",
            "a//b",
            "a/b/c:d",
            "github.com/hashicorp/example",
            "a/b/c?x=1",
            "a/b/c#f",
            "a/b c/d",
            "a/b/c/d%2F..",
        ] {
            assert_eq!(coordinate(reference), None, "{reference}");
        }
    }

    #[test]
    fn test_absolute_location() {
        let endpoint = "https://registry.example/v1/modules/a/b/c/1.0.0/download";
        assert_eq!(
            absolute_location(endpoint, "git::https://github.com/a/b?ref=v1").unwrap(),
            "git::https://github.com/a/b?ref=v1"
        );
        assert_eq!(
            absolute_location(endpoint, "/archives/b.tar.gz").unwrap(),
            "https://registry.example/archives/b.tar.gz"
        );
        assert_eq!(
            absolute_location(endpoint, "./b.tar.gz").unwrap(),
            "https://registry.example/v1/modules/a/b/c/1.0.0/b.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_refuses_without_download_permission() {
        let client = Client::new();
        let remote = Arc::new(RemoteResolver::new(client.clone(), StageLimits::default()));
        // Unroutable address: reaching the network would fail the test.
        let resolver = RegistryResolver::new(client, "http://192.0.2.1", remote);
        let desc = SourceDescriptor::new("hashicorp/consul/aws").with_version("1.2.0");

        let result = resolver
            .resolve(&ResolveContext::new(), &desc, &MemFs::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
