//! Module source resolution and archive staging.
//!
//! `modsrc-core` turns a declared module source (a local path, a registry
//! coordinate such as `hashicorp/consul/aws`, or a remote archive URL) into a
//! fully materialised in-memory filesystem that configuration parsers can
//! read without knowing where the files came from.
//!
//! Resolution runs through a [`ResolverChain`]: resolvers are tried in a fixed
//! order and the first one that recognises the source owns the outcome,
//! success or failure. Downloaded archives are expanded by the
//! [`ArchiveStager`] into a [`MemFs`].
//!
//! # Examples
//!
//! ```no_run
//! use modsrc_core::MemFs;
//! use modsrc_core::ResolveContext;
//! use modsrc_core::ResolverChain;
//! use modsrc_core::ResolverConfig;
//! use modsrc_core::SourceDescriptor;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = ResolverChain::standard(&ResolverConfig::default())?;
//! let desc = SourceDescriptor::new("hashicorp/consul/aws")
//!     .with_version("~> 0.11")
//!     .allow_downloads(true);
//!
//! let resolved = chain
//!     .resolve_required(&ResolveContext::new(), &desc, &MemFs::new())
//!     .await?;
//! for file in resolved.fs.files() {
//!     println!("{file}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod context;
pub mod error;
mod http;
pub mod report;
pub mod resolve;
pub mod source;
#[doc(hidden)]
pub mod test_utils;
pub mod version;
pub mod vfs;

// Re-export main API types
pub use archive::ArchiveStager;
pub use archive::stage_archive;
pub use config::ResolverConfig;
pub use config::StageLimits;
pub use context::ResolveContext;
pub use error::FsError;
pub use error::QuotaResource;
pub use error::ResolveError;
pub use error::Result;
pub use report::StageReport;
pub use resolve::Resolved;
pub use resolve::Resolver;
pub use resolve::ResolverChain;
pub use source::SourceDescriptor;
pub use version::VersionConstraint;
pub use vfs::MemFs;
