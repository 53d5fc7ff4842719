//! Error types for module source resolution and archive staging.

use thiserror::Error;

/// Result type alias using `ResolveError`.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Represents a specific staging quota that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResource {
    /// Entry count quota exceeded.
    EntryCount {
        /// Current entry count.
        current: usize,
        /// Maximum allowed entry count.
        max: usize,
    },
    /// Total expanded size quota exceeded.
    TotalSize {
        /// Current total size in bytes.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single entry size quota exceeded.
    EntrySize {
        /// Entry size in bytes.
        size: u64,
        /// Maximum allowed entry size in bytes.
        max: u64,
    },
    /// Integer overflow detected in quota tracking.
    IntegerOverflow,
}

impl std::fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryCount { current, max } => {
                write!(f, "quota exceeded: entry count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "quota exceeded: total size ({current} > {max})")
            }
            Self::EntrySize { size, max } => {
                write!(f, "quota exceeded: single entry size ({size} > {max})")
            }
            Self::IntegerOverflow => {
                write!(f, "quota exceeded: integer overflow in quota tracking")
            }
        }
    }
}

/// Errors raised by the in-memory filesystem.
///
/// Every variant carries the normalised path that triggered it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// The path does not exist.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// An ancestor of the path is a regular file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A file operation was attempted on a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// A non-recursive remove targeted a directory with children.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The path escapes the filesystem root or names the root where an
    /// entry is required.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl FsError {
    /// Returns the path the error refers to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound(p)
            | Self::NotADirectory(p)
            | Self::IsADirectory(p)
            | Self::DirectoryNotEmpty(p)
            | Self::InvalidPath(p) => p,
        }
    }
}

/// Errors that can occur while resolving a module source.
///
/// Returning any of these from a resolver means the resolver claimed the
/// descriptor; "not applicable" is expressed as `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// In-memory filesystem operation failed.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),

    /// HTTP request could not be completed.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Request URL.
        url: String,
        /// Underlying client error.
        source: reqwest::Error,
    },

    /// HTTP request exceeded the client timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// Server answered with an unexpected status code.
    #[error("unexpected status code {status} from {url}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The caller cancelled the resolution.
    #[error("resolution cancelled")]
    Cancelled,

    /// The caller-supplied deadline elapsed.
    #[error("resolution deadline exceeded")]
    DeadlineExceeded,

    /// Registry version listing did not contain exactly one module.
    #[error("unexpected module count: 1 module expected, found {count}")]
    UnexpectedModuleCount {
        /// Number of module entries in the response.
        count: usize,
    },

    /// Registry version listing contained no versions.
    #[error("no available versions for module {module}")]
    NoVersionsAvailable {
        /// Module coordinate.
        module: String,
    },

    /// No published version satisfies the requested constraint.
    #[error("no version satisfies constraint '{constraint}'")]
    NoMatchingVersion {
        /// Constraint expression as written by the caller.
        constraint: String,
    },

    /// Version constraint expression could not be parsed.
    #[error("invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint {
        /// Constraint expression as written by the caller.
        constraint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Server response could not be interpreted.
    #[error("invalid response from {url}: {reason}")]
    InvalidResponse {
        /// Request URL.
        url: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// Archive contains an entry type that cannot be staged.
    #[error("unsupported archive entry '{path}' of type {kind}")]
    UnsupportedEntry {
        /// Entry path inside the archive.
        path: String,
        /// Human-readable entry type.
        kind: &'static str,
    },

    /// Archive is truncated, corrupted or contains an invalid entry path.
    #[error("invalid archive {path}: {reason}")]
    InvalidArchive {
        /// Archive location in the filesystem being staged into.
        path: String,
        /// Failure description.
        reason: String,
    },

    /// Staging quota exceeded.
    #[error("{resource}")]
    QuotaExceeded {
        /// Description of the exceeded resource.
        resource: QuotaResource,
    },

    /// Source reference was claimed but could not be turned into a request.
    #[error("invalid source '{reference}': {reason}")]
    InvalidSource {
        /// Source reference.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No resolver knows how to fetch the source reference.
    #[error("no resolver can handle source '{reference}'")]
    UnsupportedSource {
        /// Source reference.
        reference: String,
    },
}

impl ResolveError {
    /// Returns `true` for transport-level failures: connection errors,
    /// timeouts and unexpected status codes.
    ///
    /// # Examples
    ///
    /// ```
    /// use modsrc_core::ResolveError;
    ///
    /// let err = ResolveError::Status {
    ///     url: "https://registry.example/v1/modules/a/b/c/versions".into(),
    ///     status: 500,
    /// };
    /// assert!(err.is_network());
    /// assert!(!ResolveError::Cancelled.is_network());
    /// ```
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Timeout { .. } | Self::Status { .. }
        )
    }

    /// Returns `true` if the caller's context stopped the resolution.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Returns `true` if a registry answered with data that cannot be used.
    #[must_use]
    pub const fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedModuleCount { .. }
                | Self::NoVersionsAvailable { .. }
                | Self::NoMatchingVersion { .. }
                | Self::InvalidResponse { .. }
        )
    }

    /// Returns `true` for archive format problems.
    ///
    /// # Examples
    ///
    /// ```
    /// use modsrc_core::ResolveError;
    ///
    /// let err = ResolveError::UnsupportedEntry {
    ///     path: "link".into(),
    ///     kind: "symlink",
    /// };
    /// assert!(err.is_archive_format());
    /// ```
    #[must_use]
    pub const fn is_archive_format(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedEntry { .. } | Self::InvalidArchive { .. } | Self::QuotaExceeded { .. }
        )
    }

    /// Returns `true` for in-memory filesystem failures.
    #[must_use]
    pub const fn is_filesystem(&self) -> bool {
        matches!(self, Self::Filesystem(_))
    }

    /// Returns the URL involved in a network or response error, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Http { url, .. }
            | Self::Timeout { url }
            | Self::Status { url, .. }
            | Self::InvalidResponse { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Returns the quota resource that was exceeded, if applicable.
    #[must_use]
    pub const fn quota_resource(&self) -> Option<&QuotaResource> {
        match self {
            Self::QuotaExceeded { resource } => Some(resource),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ResolveError::Status {
            url: "https://registry.terraform.io/v1/modules/a/b/c/download".into(),
            status: 404,
        };
        let display = err.to_string();
        assert!(display.contains("404"));
        assert!(display.contains("/v1/modules/a/b/c/download"));
        assert!(err.is_network());
        assert_eq!(
            err.url(),
            Some("https://registry.terraform.io/v1/modules/a/b/c/download")
        );
    }

    #[test]
    fn test_module_count_error() {
        let err = ResolveError::UnexpectedModuleCount { count: 2 };
        assert!(err.to_string().contains("found 2"));
        assert!(err.is_malformed_response());
        assert!(!err.is_network());
    }

    #[test]
    fn test_no_matching_version_error() {
        let err = ResolveError::NoMatchingVersion {
            constraint: ">=3.0".into(),
        };
        assert_eq!(err.to_string(), "no version satisfies constraint '>=3.0'");
        assert!(err.is_malformed_response());
    }

    #[test]
    fn test_unsupported_entry_error() {
        let err = ResolveError::UnsupportedEntry {
            path: "chart/link".into(),
            kind: "symlink",
        };
        let display = err.to_string();
        assert!(display.contains("chart/link"));
        assert!(display.contains("symlink"));
        assert!(err.is_archive_format());
        assert!(!err.is_filesystem());
    }

    #[test]
    fn test_cancellation_is_distinct_from_network() {
        assert!(ResolveError::Cancelled.is_cancelled());
        assert!(ResolveError::DeadlineExceeded.is_cancelled());
        assert!(!ResolveError::Cancelled.is_network());

        let err = ResolveError::Timeout {
            url: "https://example.com".into(),
        };
        assert!(err.is_network());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_fs_error_conversion() {
        let err: ResolveError = FsError::DirectoryNotEmpty("modules".into()).into();
        assert!(err.is_filesystem());
        assert!(err.to_string().contains("directory not empty: modules"));
    }

    #[test]
    fn test_fs_error_path() {
        assert_eq!(FsError::NotFound("a/b".into()).path(), "a/b");
        assert_eq!(FsError::InvalidPath("../x".into()).path(), "../x");
    }

    #[test]
    fn test_quota_exceeded_error() {
        let err = ResolveError::QuotaExceeded {
            resource: QuotaResource::EntryCount {
                current: 11,
                max: 10,
            },
        };
        let display = err.to_string();
        assert!(display.contains("quota exceeded"));
        assert!(display.contains("entry count"));
        assert!(err.is_archive_format());
        assert_eq!(
            err.quota_resource(),
            Some(&QuotaResource::EntryCount {
                current: 11,
                max: 10
            })
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: ResolveError = io_err.into();
        assert!(matches!(err, ResolveError::Io(_)));
        assert_eq!(err.url(), None);
    }
}
