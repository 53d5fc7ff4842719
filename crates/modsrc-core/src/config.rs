//! Resolver and staging configuration.

use std::time::Duration;

/// Public Terraform module registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.terraform.io";

/// Bounded timeout applied to every registry and download request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits applied while expanding an archive into a filesystem.
///
/// # Examples
///
/// ```
/// use modsrc_core::StageLimits;
///
/// let limits = StageLimits {
///     max_entries: 500,
///     ..Default::default()
/// };
/// assert_eq!(limits.max_entry_size, 50 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLimits {
    /// Maximum number of directory and file entries.
    pub max_entries: usize,

    /// Maximum size for a single file entry in bytes.
    pub max_entry_size: u64,

    /// Maximum total size of all file entries in bytes.
    pub max_total_size: u64,
}

impl Default for StageLimits {
    /// Default values:
    /// - `max_entries`: 10,000
    /// - `max_entry_size`: 50 MB
    /// - `max_total_size`: 500 MB
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_entry_size: 50 * 1024 * 1024,  // 50 MB
            max_total_size: 500 * 1024 * 1024, // 500 MB
        }
    }
}

impl StageLimits {
    /// Limits that never trip.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_entries: usize::MAX,
            max_entry_size: u64::MAX,
            max_total_size: u64::MAX,
        }
    }
}

/// Configuration shared by the resolver chain.
///
/// The HTTP client built from this configuration is owned by the chain and
/// injected into the network resolvers, so tests can point the registry at a
/// local stub.
///
/// # Examples
///
/// ```
/// use modsrc_core::ResolverConfig;
/// use std::time::Duration;
///
/// let config = ResolverConfig {
///     registry_url: "http://127.0.0.1:8080".to_string(),
///     http_timeout: Duration::from_secs(2),
///     ..Default::default()
/// };
/// assert_eq!(config.cache_capacity, 128);
/// ```
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Base URL of the module registry.
    pub registry_url: String,

    /// Timeout for each HTTP request.
    pub http_timeout: Duration,

    /// User agent sent with HTTP requests.
    pub user_agent: String,

    /// Number of resolutions remembered by the cache resolver. Zero disables
    /// the cache.
    pub cache_capacity: usize,

    /// Archive staging limits for downloaded modules.
    pub stage_limits: StageLimits,
}

impl Default for ResolverConfig {
    /// Default values:
    /// - `registry_url`: `https://registry.terraform.io`
    /// - `http_timeout`: 5 seconds
    /// - `user_agent`: `modsrc/<version>`
    /// - `cache_capacity`: 128
    /// - `stage_limits`: [`StageLimits::default`]
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: concat!("modsrc/", env!("CARGO_PKG_VERSION")).to_string(),
            cache_capacity: 128,
            stage_limits: StageLimits::default(),
        }
    }
}
