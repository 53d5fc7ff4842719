//! Archive staging reporting.

use std::time::Duration;

/// Report of an archive staging operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Number of regular files written.
    pub files_staged: usize,

    /// Number of directory entries replayed.
    pub directories_created: usize,

    /// Total bytes written into the filesystem.
    pub bytes_written: u64,

    /// Number of metadata records (pax global headers) skipped.
    pub metadata_skipped: usize,

    /// Entries dropped by `strip_components` because nothing was left of
    /// their path.
    pub entries_stripped: usize,

    /// Duration of the staging operation.
    pub duration: Duration,
}

impl StageReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns total number of entries replayed.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_staged + self.directories_created
    }
}
