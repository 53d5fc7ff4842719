//! Error conversion utilities for CLI.
//!
//! Converts modsrc-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use modsrc_core::FsError;
use modsrc_core::ResolveError;
use std::path::Path;

/// Converts a resolution failure for `source` into an anyhow error with
/// hints.
pub fn convert_resolve_error(err: ResolveError, source: &str) -> anyhow::Error {
    match err {
        ResolveError::Timeout { url } => {
            anyhow!(
                "Timed out resolving '{source}' (request to {url})\n\
                 HINT: Use --timeout to allow slower registries."
            )
        }
        ResolveError::Http { .. } | ResolveError::Status { .. } => {
            anyhow!(
                "Registry request failed while resolving '{source}': {err}\n\
                 HINT: Check network access, or point --registry at a reachable registry."
            )
        }
        ResolveError::NoMatchingVersion { constraint } => {
            anyhow!(
                "No published version of '{source}' satisfies '{constraint}'\n\
                 HINT: Relax the constraint passed with --constraint."
            )
        }
        ResolveError::InvalidConstraint { constraint, reason } => {
            anyhow!(
                "Invalid version constraint '{constraint}': {reason}\n\
                 HINT: Use comma-separated clauses such as '>= 1.2, < 2.0' or '~> 1.4'."
            )
        }
        ResolveError::UnsupportedSource { reference } => {
            anyhow!(
                "No resolver can handle source '{reference}'\n\
                 HINT: Supported sources are ./ or ../ paths, registry coordinates \
                 (namespace/name/provider) and http(s) tar archives. \
                 Network sources are skipped with --offline."
            )
        }
        ResolveError::Filesystem(FsError::NotFound(path)) => {
            anyhow!(
                "Module directory '{path}' not found while resolving '{source}'\n\
                 HINT: Local paths are relative to --module-path inside --base."
            )
        }
        ResolveError::Cancelled | ResolveError::DeadlineExceeded => {
            anyhow!("Resolution of '{source}' was interrupted: {err}")
        }
        err if err.is_archive_format() => convert_stage_error(err, Path::new(source)),
        _ => anyhow::Error::from(err).context(format!("Error resolving source '{source}'")),
    }
}

/// Converts an archive staging failure into an anyhow error with hints.
pub fn convert_stage_error(err: ResolveError, archive: &Path) -> anyhow::Error {
    match err {
        ResolveError::UnsupportedEntry { path, kind } => {
            anyhow!(
                "Archive '{}' contains unsupported {kind} entry '{path}'\n\
                 HINT: Only regular files and directories can be staged.",
                archive.display()
            )
        }
        ResolveError::QuotaExceeded { resource } => {
            anyhow!(
                "Staging limit exceeded for '{}': {resource}\n\
                 HINT: Use --max-files, --max-total-size, or --max-file-size to increase limits.",
                archive.display()
            )
        }
        ResolveError::InvalidArchive { reason, .. } => {
            anyhow!(
                "Invalid archive '{}': {reason}\n\
                 HINT: The archive may be corrupted, or not a tar/tar.gz file.",
                archive.display()
            )
        }
        ResolveError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {io_err}",
                archive.display()
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_no_matching_version() {
        let err = ResolveError::NoMatchingVersion {
            constraint: ">= 3.0".into(),
        };
        let msg = format!("{:?}", convert_resolve_error(err, "hashicorp/consul/aws"));
        assert!(msg.contains("hashicorp/consul/aws"));
        assert!(msg.contains(">= 3.0"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_timeout() {
        let err = ResolveError::Timeout {
            url: "https://registry.example/v1/modules/a/b/c/versions".into(),
        };
        let msg = format!("{:?}", convert_resolve_error(err, "a/b/c"));
        assert!(msg.contains("--timeout"));
    }

    #[test]
    fn test_convert_symlink_entry() {
        let err = ResolveError::UnsupportedEntry {
            path: "chart/link".into(),
            kind: "symlink",
        };
        let msg = format!("{:?}", convert_stage_error(err, Path::new("chart.tgz")));
        assert!(msg.contains("symlink"));
        assert!(msg.contains("chart.tgz"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_archive_errors_during_resolution_use_stage_hints() {
        let err = ResolveError::UnsupportedEntry {
            path: "link".into(),
            kind: "hardlink",
        };
        let msg = format!("{:?}", convert_resolve_error(err, "https://example.com/m.tar.gz"));
        assert!(msg.contains("Only regular files"));
    }
}
