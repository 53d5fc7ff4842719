//! Remote archive resolution.

use reqwest::Client;
use sha2::Digest;
use sha2::Sha256;
use url::Url;

use crate::ArchiveStager;
use crate::FsError;
use crate::MemFs;
use crate::ResolveContext;
use crate::ResolveError;
use crate::Result;
use crate::SourceDescriptor;
use crate::StageLimits;
use crate::archive::Compression;
use crate::http;
use crate::resolve::Resolved;
use crate::resolve::Resolver;
use crate::source;
use crate::vfs::DEFAULT_FILE_MODE;
use crate::vfs::path;

/// Default host serving GitHub repository tarballs.
pub const GITHUB_ARCHIVE_URL: &str = "https://codeload.github.com";

/// Hex characters of the URL digest used to name downloaded archives.
const DIGEST_PREFIX_LEN: usize = 16;

/// How a source reference is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchPlan {
    url: Url,
    compression: Option<Compression>,
    strip_components: usize,
    skip_global_headers: bool,
}

/// Downloads tar and tar.gz archives over HTTP(S) and stages them.
///
/// Recognised sources:
///
/// - `http://` and `https://` URLs, optionally prefixed with `http::`,
///   `https::` or `tar::`. An `archive=` query parameter overrides the
///   framing guessed from the URL path.
/// - GitHub repositories (`github.com/owner/repo`,
///   `git::https://github.com/owner/repo.git`, `git::git@github.com:owner/repo.git`)
///   with an optional `?ref=`. These are fetched as repository tarballs,
///   their top-level directory is stripped and their pax global header is
///   skipped.
///
/// Each download is staged into a fresh filesystem under a name derived
/// from the SHA-256 of the URL, reported as `download_path`. A body larger
/// than [`StageLimits::max_total_size`] fails with a quota error before it is
/// fully buffered.
#[derive(Debug, Clone)]
pub struct RemoteResolver {
    client: Client,
    limits: StageLimits,
    github_archive_url: String,
}

impl RemoteResolver {
    /// Creates a resolver using `client` for downloads.
    #[must_use]
    pub fn new(client: Client, limits: StageLimits) -> Self {
        Self {
            client,
            limits,
            github_archive_url: GITHUB_ARCHIVE_URL.to_string(),
        }
    }

    /// Overrides the host serving GitHub tarballs.
    #[must_use]
    pub fn with_github_archive_url(mut self, url: impl Into<String>) -> Self {
        self.github_archive_url = url.into();
        self
    }

    /// Returns `None` if the reference is not something this resolver
    /// fetches.
    fn plan(&self, reference: &str) -> Option<Result<FetchPlan>> {
        let getter = source::getter_prefix(reference);
        let address = getter.map_or(reference, |g| &reference[g.len() + 2..]);

        match getter {
            Some("git") => {
                let (owner, repo, git_ref) = parse_github(address)?;
                Some(self.github_plan(reference, owner, repo, git_ref.as_deref()))
            }
            None if address.starts_with("github.com/") => {
                let (owner, repo, git_ref) = parse_github(address)?;
                Some(self.github_plan(reference, owner, repo, git_ref.as_deref()))
            }
            None | Some("http" | "https" | "tar") => {
                if !(address.starts_with("http://") || address.starts_with("https://")) {
                    return None;
                }
                Some(archive_plan(reference, address))
            }
            Some(_) => None,
        }
    }

    fn github_plan(
        &self,
        reference: &str,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
    ) -> Result<FetchPlan> {
        let base = self.github_archive_url.trim_end_matches('/');
        let git_ref = git_ref.unwrap_or("HEAD");
        let url = Url::parse(&format!("{base}/{owner}/{repo}/tar.gz/{git_ref}"))
            .map_err(|e| invalid_source(reference, &e.to_string()))?;
        Ok(FetchPlan {
            url,
            compression: Some(Compression::Gzip),
            strip_components: 1,
            skip_global_headers: true,
        })
    }

    async fn download(&self, ctx: &ResolveContext, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "downloading module archive");
        let response = http::send(ctx, url, self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(ResolveError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        http::read_body_limited(ctx, url, response, self.limits.max_total_size).await
    }
}

#[async_trait::async_trait]
impl Resolver for RemoteResolver {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn caches_results(&self) -> bool {
        true
    }

    async fn resolve(
        &self,
        ctx: &ResolveContext,
        desc: &SourceDescriptor,
        _base: &MemFs,
    ) -> Result<Option<Resolved>> {
        if !desc.allow_downloads {
            return Ok(None);
        }

        let (reference, subdir) = source::split_subdir(&desc.source);
        let Some(plan) = self.plan(&reference) else {
            return Ok(None);
        };
        let plan = plan?;
        let relative_path = path::join(&subdir, &desc.relative_path)?;

        let url = plan.url.as_str();
        let body = self.download(ctx, url).await?;
        let compression = plan
            .compression
            .unwrap_or_else(|| Compression::sniff(&body[..body.len().min(2)]));
        let download_path = download_name(url, compression);

        let mut fs = MemFs::new();
        fs.write_file(&download_path, body, DEFAULT_FILE_MODE)?;
        let report = ArchiveStager::new()
            .limits(self.limits)
            .strip_components(plan.strip_components)
            .skip_global_headers(plan.skip_global_headers)
            .stage_into(&mut fs, &download_path)?;

        if !fs.is_dir(&relative_path) {
            return Err(FsError::NotFound(relative_path).into());
        }

        tracing::debug!(
            module = desc.display_name(),
            url,
            files = report.files_staged,
            relative_path = %relative_path,
            "resolved remote module"
        );
        Ok(Some(Resolved {
            fs,
            prefix: String::new(),
            download_path,
            relative_path,
        }))
    }
}

fn invalid_source(reference: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidSource {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

fn archive_plan(reference: &str, address: &str) -> Result<FetchPlan> {
    let mut url = Url::parse(address).map_err(|e| invalid_source(reference, &e.to_string()))?;

    let mut archive_hint = None;
    let rest: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, value)| {
            if key == "archive" {
                archive_hint = Some(value.into_owned());
                None
            } else {
                Some((key.into_owned(), value.into_owned()))
            }
        })
        .collect();

    let compression = match archive_hint {
        Some(hint) => {
            url.set_query(None);
            if !rest.is_empty() {
                url.query_pairs_mut().extend_pairs(rest);
            }
            Some(Compression::from_name(&format!("archive.{hint}")).ok_or_else(|| {
                invalid_source(reference, &format!("unsupported archive format '{hint}'"))
            })?)
        }
        None => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(Compression::from_name),
    };

    Ok(FetchPlan {
        url,
        compression,
        strip_components: 0,
        skip_global_headers: false,
    })
}

/// Extracts (owner, repo, ref) from a GitHub repository address.
fn parse_github(address: &str) -> Option<(&str, &str, Option<String>)> {
    let (location, query) = address.split_once('?').map_or((address, None), |(l, q)| (l, Some(q)));

    let repo_path = location
        .strip_prefix("https://github.com/")
        .or_else(|| location.strip_prefix("ssh://git@github.com/"))
        .or_else(|| location.strip_prefix("git@github.com:"))
        .or_else(|| location.strip_prefix("github.com/"))?;

    let mut segments = repo_path.trim_end_matches('/').split('/');
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments.next().filter(|s| !s.is_empty())?;
    if segments.next().is_some() {
        return None;
    }
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    let git_ref = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "ref")
            .map(|(_, value)| value.into_owned())
    });
    Some((owner, repo, git_ref))
}

/// Content-addressed name for a downloaded archive.
fn download_name(url: &str, compression: Compression) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}.{}", &digest[..DIGEST_PREFIX_LEN], compression.extension())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn resolver() -> RemoteResolver {
        RemoteResolver::new(Client::new(), StageLimits::default())
    }

    fn plan(reference: &str) -> Option<FetchPlan> {
        resolver().plan(reference).map(|p| p.unwrap())
    }

    #[test]
    fn test_plan_plain_archive_url() {
        let plan = plan("https://example.com/modules/vpc.tar.gz").unwrap();
        assert_eq!(plan.url.as_str(), "https://example.com/modules/vpc.tar.gz");
        assert_eq!(plan.compression, Some(Compression::Gzip));
        assert_eq!(plan.strip_components, 0);
        assert!(!plan.skip_global_headers);
    }

    #[test]
    fn test_plan_with_getter_prefix() {
        let plan = plan("tar::https://example.com/m.tar").unwrap();
        assert_eq!(plan.url.as_str(), "https://example.com/m.tar");
        assert_eq!(plan.compression, Some(Compression::Plain));
    }

    #[test]
    fn test_plan_archive_query_override() {
        let plan = plan("https://example.com/download?archive=tgz&token=abc").unwrap();
        assert_eq!(plan.url.as_str(), "https://example.com/download?token=abc");
        assert_eq!(plan.compression, Some(Compression::Gzip));

        let plan = self::plan("https://example.com/download?archive=tar.gz").unwrap();
        assert_eq!(plan.url.as_str(), "https://example.com/download");
    }

    #[test]
    fn test_plan_unknown_extension_defers_to_sniffing() {
        let plan = plan("https://example.com/download").unwrap();
        assert_eq!(plan.compression, None);
    }

    #[test]
    fn test_plan_rejects_unsupported_archive_format() {
        let err = resolver()
            .plan("https://example.com/m?archive=zip")
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidSource { .. }));
    }

    #[test]
    fn test_plan_github_forms() {
        for reference in [
            "github.com/hashicorp/example",
            "git::https://github.com/hashicorp/example.git",
            "git::git@github.com:hashicorp/example.git",
            "git::ssh://git@github.com/hashicorp/example.git",
        ] {
            let plan = plan(reference).unwrap();
            assert_eq!(
                plan.url.as_str(),
                "https://codeload.github.com/hashicorp/example/tar.gz/HEAD",
                "{reference}"
            );
            assert_eq!(plan.strip_components, 1);
            assert_eq!(plan.compression, Some(Compression::Gzip));
            assert!(plan.skip_global_headers);
        }
    }

    #[test]
    fn test_plan_github_ref() {
        let plan = plan("git::https://github.com/org/repo.git?ref=v1.2.0").unwrap();
        assert_eq!(
            plan.url.as_str(),
            "https://codeload.github.com/org/repo/tar.gz/v1.2.0"
        );
    }

    #[test]
    fn test_plan_not_applicable() {
        for reference in [
            "hashicorp/consul/aws",
            "./modules/vpc",
            "s3::https://bucket.s3.amazonaws.com/m.zip",
            "git::https://gitlab.com/org/repo.git",
            "ftp://example.com/m.tar",
            "github.com/only-owner",
        ] {
            assert!(resolver().plan(reference).is_none(), "{reference}");
        }
    }

    #[test]
    fn test_download_name_is_content_addressed() {
        let a = download_name("https://example.com/a.tar.gz", Compression::Gzip);
        let b = download_name("https://example.com/b.tar.gz", Compression::Gzip);
        assert_ne!(a, b);
        assert!(a.ends_with(".tar.gz"));
        assert_eq!(a.len(), DIGEST_PREFIX_LEN + ".tar.gz".len());
        assert_eq!(a, download_name("https://example.com/a.tar.gz", Compression::Gzip));
    }

    #[tokio::test]
    async fn test_refuses_without_download_permission() {
        let desc = SourceDescriptor::new("https://example.com/m.tar.gz").allow_downloads(false);
        let result = resolver()
            .resolve(&ResolveContext::new(), &desc, &MemFs::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
