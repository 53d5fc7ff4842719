//! Archive staging: expanding tar and tar.gz streams into a [`MemFs`].
//!
//! The archive is read from the filesystem it is staged into. Entries are
//! replayed in stream order: directories through `mkdir_all`, regular files
//! by creating their parent directories and copying the body in chunks.
//! Any other entry type aborts staging. The archive file is removed before
//! its entries are replayed, so an entry may reuse the archive's own path.
//!
//! Failures leave partially written entries behind; callers discard the
//! target filesystem on error. [`ArchiveStager::stage`] always works on a
//! clone, so the filesystem passed in is never touched.

mod compression;
pub mod copy;
mod entry;
mod quota;

use std::io::Read;
use std::time::Instant;

use flate2::read::GzDecoder;

pub use compression::Compression;
pub use entry::EntryKind;
pub use quota::QuotaTracker;

use crate::MemFs;
use crate::ResolveError;
use crate::Result;
use crate::StageLimits;
use crate::StageReport;
use crate::vfs::DEFAULT_DIR_MODE;
use crate::vfs::DEFAULT_FILE_MODE;
use crate::vfs::path;
use copy::CopyBuffer;
use copy::copy_with_buffer;

/// Expands archives into an in-memory filesystem.
///
/// # Examples
///
/// ```
/// use modsrc_core::archive::ArchiveStager;
/// use modsrc_core::test_utils::create_test_tar_gz;
/// use modsrc_core::MemFs;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut working = MemFs::new();
/// working.write_file(
///     "chart.tgz",
///     create_test_tar_gz(vec![("chart/Chart.yaml", b"name: app")]),
///     0o644,
/// )?;
///
/// let staged = ArchiveStager::new().stage(&working, "chart.tgz")?;
/// assert_eq!(staged.read("chart/Chart.yaml")?, b"name: app");
/// assert!(!staged.exists("chart.tgz"));
/// assert!(working.exists("chart.tgz"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveStager {
    limits: StageLimits,
    dest: String,
    strip_components: usize,
    skip_global_headers: bool,
}

impl ArchiveStager {
    /// Creates a stager that expands into the filesystem root with default
    /// limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staging limits.
    #[must_use]
    pub fn limits(mut self, limits: StageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Expands entries below `dest` instead of the root.
    #[must_use]
    pub fn destination(mut self, dest: impl Into<String>) -> Self {
        self.dest = dest.into();
        self
    }

    /// Drops the given number of leading path components from every entry.
    #[must_use]
    pub fn strip_components(mut self, count: usize) -> Self {
        self.strip_components = count;
        self
    }

    /// Skips pax global headers instead of failing on them.
    ///
    /// `git archive` tarballs carry one holding the commit id.
    #[must_use]
    pub fn skip_global_headers(mut self, skip: bool) -> Self {
        self.skip_global_headers = skip;
        self
    }

    /// Stages the archive at `archive_path` into a clone of `fs`.
    ///
    /// Returns the populated clone, without the archive file.
    pub fn stage(&self, fs: &MemFs, archive_path: &str) -> Result<MemFs> {
        self.stage_with_report(fs, archive_path)
            .map(|(staged, _)| staged)
    }

    /// Same as [`ArchiveStager::stage`], also returning a [`StageReport`].
    pub fn stage_with_report(
        &self,
        fs: &MemFs,
        archive_path: &str,
    ) -> Result<(MemFs, StageReport)> {
        let mut target = fs.clone();
        let report = self.stage_into(&mut target, archive_path)?;
        Ok((target, report))
    }

    /// Stages the archive at `archive_path` directly into `target`.
    ///
    /// On error `target` may hold a partial expansion and no longer holds
    /// the archive.
    pub fn stage_into(&self, target: &mut MemFs, archive_path: &str) -> Result<StageReport> {
        let start = Instant::now();
        let archive_path = path::normalize(archive_path)?;
        let dest = path::normalize(&self.dest)?;

        let file = target.open(&archive_path)?;
        target.remove(&archive_path)?;
        let compression = Compression::detect(path::file_name(&archive_path), file.head(2));
        tracing::debug!(
            archive = %archive_path,
            compression = compression.extension(),
            "staging archive"
        );

        let reader: Box<dyn Read> = match compression {
            Compression::Gzip => Box::new(GzDecoder::new(file)),
            Compression::Plain => Box::new(file),
        };

        let mut report = StageReport::new();
        let mut quota = QuotaTracker::new();
        let mut buffer = CopyBuffer::new();
        let mut archive = tar::Archive::new(reader);

        let entries = archive
            .entries()
            .map_err(|e| invalid_archive(&archive_path, &e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| invalid_archive(&archive_path, &e))?;
            let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let kind = EntryKind::from(entry.header().entry_type());

            match kind {
                EntryKind::Unsupported(kind) => {
                    return Err(ResolveError::UnsupportedEntry { path: raw, kind });
                }
                EntryKind::GlobalHeader if !self.skip_global_headers => {
                    return Err(ResolveError::UnsupportedEntry {
                        path: raw,
                        kind: "pax global header",
                    });
                }
                EntryKind::GlobalHeader => {
                    tracing::warn!(
                        archive = %archive_path,
                        entry = %raw,
                        "skipping pax global header"
                    );
                    report.metadata_skipped += 1;
                    continue;
                }
                EntryKind::Directory | EntryKind::File => {}
            }

            let normalized = path::normalize(&raw).map_err(|_| ResolveError::InvalidArchive {
                path: archive_path.clone(),
                reason: format!("entry path escapes archive root: {raw}"),
            })?;
            if kind.is_file() && normalized.is_empty() {
                return Err(ResolveError::InvalidArchive {
                    path: archive_path.clone(),
                    reason: format!("file entry without a name: {raw:?}"),
                });
            }
            let Some(stripped) = path::strip_components(&normalized, self.strip_components) else {
                report.entries_stripped += usize::from(!normalized.is_empty());
                continue;
            };
            let entry_path = path::join(&dest, stripped)?;
            let mode = entry.header().mode().map_or(
                if kind.is_file() {
                    DEFAULT_FILE_MODE
                } else {
                    DEFAULT_DIR_MODE
                },
                |m| m & 0o7777,
            );

            if kind.is_directory() {
                quota.record_directory(&self.limits)?;
                target.mkdir_all(&entry_path, mode)?;
                report.directories_created += 1;
                continue;
            }

            let size = entry.size();
            quota.record_file(size, &self.limits)?;

            if let Some(parent) = path::parent(&entry_path) {
                target.mkdir_all(parent, DEFAULT_DIR_MODE)?;
            }

            tracing::debug!(entry = %entry_path, size, "staging file");
            let capacity = usize::try_from(size).unwrap_or(usize::MAX).min(buffer.size());
            let mut contents = Vec::with_capacity(capacity);
            let written = copy_with_buffer(&mut entry, &mut contents, &mut buffer).map_err(
                |e| match e {
                    ResolveError::Io(io) => invalid_archive(&archive_path, &io),
                    other => other,
                },
            )?;
            if written != size {
                return Err(ResolveError::InvalidArchive {
                    path: archive_path.clone(),
                    reason: format!(
                        "entry {raw} truncated: expected {size} bytes, read {written}"
                    ),
                });
            }
            target.write_file(&entry_path, contents, mode)?;

            report.files_staged += 1;
            report.bytes_written += written;
        }

        drop(archive);

        report.duration = start.elapsed();
        tracing::debug!(
            archive = %archive_path,
            files = report.files_staged,
            directories = report.directories_created,
            bytes = report.bytes_written,
            "archive staged"
        );
        Ok(report)
    }
}

/// Stages the archive at `archive_path` into a clone of `fs` with default
/// settings.
///
/// This is the entry point used for package archives found inside a
/// working filesystem (chart bundles and similar).
pub fn stage_archive(fs: &MemFs, archive_path: &str) -> Result<MemFs> {
    ArchiveStager::new().stage(fs, archive_path)
}

fn invalid_archive(archive_path: &str, err: &std::io::Error) -> ResolveError {
    ResolveError::InvalidArchive {
        path: archive_path.to_string(),
        reason: err.to_string(),
    }
}
